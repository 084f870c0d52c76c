// Scheduling Rule Domain Model

use crate::domain::directory::TenantId;
use crate::domain::error::{DomainError, Result};
use crate::domain::time_range::{DAY_MS, MINUTE_MS};
use serde::{Deserialize, Serialize};

/// Tenant-configured constraints applied to slot generation and booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingRule {
    pub tenant_id: TenantId,
    pub min_notice_minutes: u32,
    pub buffer_before_minutes: u32,
    pub buffer_after_minutes: u32,
    pub slot_increment_minutes: u32,
    pub max_days_ahead: u32,
    pub max_interviews_per_day: u32,
    pub max_suggestions: u32,
    pub max_slots_per_day: u32,
    pub reminder_lead_minutes: u32,
}

impl SchedulingRule {
    /// Defaults used when a tenant has not saved a rule
    pub fn default_for(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            min_notice_minutes: 240,
            buffer_before_minutes: 0,
            buffer_after_minutes: 10,
            slot_increment_minutes: 30,
            max_days_ahead: 14,
            max_interviews_per_day: 4,
            max_suggestions: 10,
            max_slots_per_day: 3,
            reminder_lead_minutes: 60,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range("buffer_before_minutes", self.buffer_before_minutes, 0, 240)?;
        check_range("buffer_after_minutes", self.buffer_after_minutes, 0, 240)?;
        check_range("slot_increment_minutes", self.slot_increment_minutes, 5, 240)?;
        check_range("max_days_ahead", self.max_days_ahead, 1, 90)?;
        check_range("max_interviews_per_day", self.max_interviews_per_day, 1, u32::MAX)?;
        check_range("max_suggestions", self.max_suggestions, 1, 100)?;
        check_range("max_slots_per_day", self.max_slots_per_day, 1, u32::MAX)?;
        Ok(())
    }

    pub fn min_notice_ms(&self) -> i64 {
        self.min_notice_minutes as i64 * MINUTE_MS
    }

    pub fn buffer_before_ms(&self) -> i64 {
        self.buffer_before_minutes as i64 * MINUTE_MS
    }

    pub fn buffer_after_ms(&self) -> i64 {
        self.buffer_after_minutes as i64 * MINUTE_MS
    }

    pub fn slot_increment_ms(&self) -> i64 {
        self.slot_increment_minutes as i64 * MINUTE_MS
    }

    pub fn horizon_ms(&self) -> i64 {
        self.max_days_ahead as i64 * DAY_MS
    }

    pub fn reminder_lead_ms(&self) -> i64 {
        self.reminder_lead_minutes as i64 * MINUTE_MS
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(DomainError::ValidationError(format!(
            "{} = {} is out of range ({}..={})",
            field, value, min, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_is_valid() {
        let rule = SchedulingRule::default_for("tenant-1");
        assert!(rule.validate().is_ok());
        assert_eq!(rule.min_notice_ms(), 240 * MINUTE_MS);
        assert_eq!(rule.horizon_ms(), 14 * DAY_MS);
    }

    #[test]
    fn test_rejects_zero_increment() {
        let mut rule = SchedulingRule::default_for("tenant-1");
        rule.slot_increment_minutes = 0;
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("slot_increment_minutes"));
    }

    #[test]
    fn test_rejects_large_buffer() {
        let mut rule = SchedulingRule::default_for("tenant-1");
        rule.buffer_after_minutes = 241;
        assert!(rule.validate().is_err());
    }
}
