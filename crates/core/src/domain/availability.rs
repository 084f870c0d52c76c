// Availability Domain Model (working hours, busy blocks)

use crate::domain::directory::{TenantId, UserId};
use crate::domain::error::{DomainError, Result};
use crate::domain::time_range::TimeRange;
use serde::{Deserialize, Serialize};

pub type BusyBlockId = String;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// One working window on a weekday, in the owner's local time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    /// 0 = Monday ... 6 = Sunday
    pub weekday: u8,
    pub start_minute: u32,
    pub end_minute: u32,
    pub utc_offset_minutes: i32,
}

impl WorkingHours {
    pub fn validate(&self) -> Result<()> {
        if self.weekday > 6 {
            return Err(DomainError::ValidationError(format!(
                "Weekday must be 0 (Monday) to 6 (Sunday), got {}",
                self.weekday
            )));
        }
        if self.start_minute >= self.end_minute || self.end_minute > MINUTES_PER_DAY {
            return Err(DomainError::ValidationError(format!(
                "Working window {}..{} must satisfy 0 <= start < end <= {}",
                self.start_minute, self.end_minute, MINUTES_PER_DAY
            )));
        }
        crate::domain::directory::validate_utc_offset(self.utc_offset_minutes)
    }
}

/// Where a busy block came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusySource {
    Manual,
    Google,
    Microsoft,
}

impl std::fmt::Display for BusySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusySource::Manual => write!(f, "MANUAL"),
            BusySource::Google => write!(f, "GOOGLE"),
            BusySource::Microsoft => write!(f, "MICROSOFT"),
        }
    }
}

impl std::str::FromStr for BusySource {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(BusySource::Manual),
            "GOOGLE" => Ok(BusySource::Google),
            "MICROSOFT" => Ok(BusySource::Microsoft),
            other => Err(DomainError::ValidationError(format!(
                "Unknown busy source: {}",
                other
            ))),
        }
    }
}

/// Time during which a user is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub id: BusyBlockId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub range: TimeRange,
    pub source: BusySource,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub created_at: i64,
}
