// Availability: interval arithmetic, working hours, slot suggestion

pub mod interval;
pub mod slots;
pub mod working_hours;

pub use slots::{ParticipantAvailability, SlotPlan, SlotService, SuggestSlotsRequest};

use crate::domain::{SchedulingRule, TimeRange, User, WorkingHours, DAY_MS};
use crate::error::Result;
use crate::port::{AvailabilityRepository, InterviewRepository};
use std::collections::HashMap;
use std::sync::Arc;

/// Read side shared by slot suggestion and booking conflict checks
pub struct AvailabilityReader {
    availability: Arc<dyn AvailabilityRepository>,
    interviews: Arc<dyn InterviewRepository>,
}

impl AvailabilityReader {
    pub fn new(
        availability: Arc<dyn AvailabilityRepository>,
        interviews: Arc<dyn InterviewRepository>,
    ) -> Self {
        Self {
            availability,
            interviews,
        }
    }

    /// Saved rule of the tenant, or the defaults
    pub async fn rule(&self, tenant_id: &str) -> Result<SchedulingRule> {
        Ok(self
            .availability
            .get_rule(tenant_id)
            .await?
            .unwrap_or_else(|| SchedulingRule::default_for(tenant_id)))
    }

    /// Configured rows, or Monday-Friday 09:00-17:00 in the user's offset
    pub async fn working_hours_for(&self, user: &User) -> Result<Vec<WorkingHours>> {
        let hours = self
            .availability
            .working_hours(&user.tenant_id, &user.id)
            .await?;
        if hours.is_empty() {
            return Ok(working_hours::default_hours(
                &user.tenant_id,
                &user.id,
                user.utc_offset_minutes,
            ));
        }
        Ok(hours)
    }

    pub async fn participant(
        &self,
        user: &User,
        window: TimeRange,
        rule: &SchedulingRule,
    ) -> Result<ParticipantAvailability> {
        // One extra day each side: whole local days for the daily cap, whole shifts for comfort
        let reach = window.pad(DAY_MS, DAY_MS);

        let hours = self.working_hours_for(user).await?;
        let working = working_hours::expand(&hours, reach);

        let blocks = self
            .availability
            .busy_blocks(&user.tenant_id, &user.id, reach)
            .await?;
        let interviews = self
            .interviews
            .find_active_for_user(&user.tenant_id, &user.id, reach)
            .await?;

        let mut per_day: HashMap<i64, u32> = HashMap::new();
        for interview in &interviews {
            let day = working_hours::local_day(interview.range.start, user.utc_offset_minutes);
            *per_day.entry(day).or_insert(0) += 1;
        }

        let busy: Vec<TimeRange> = blocks
            .iter()
            .map(|b| b.range)
            .chain(interviews.iter().map(|i| i.range))
            .collect();

        Ok(ParticipantAvailability::new(
            user.id.clone(),
            user.utc_offset_minutes,
            working,
            busy,
            window,
            rule.buffer_before_ms(),
            rule.buffer_after_ms(),
        )
        .with_interviews_per_day(per_day))
    }

    /// True if `range` collides with the user's padded busy time
    pub async fn has_conflict(
        &self,
        tenant_id: &str,
        user_id: &str,
        range: TimeRange,
        rule: &SchedulingRule,
        exclude_interview: Option<&str>,
    ) -> Result<bool> {
        let before = rule.buffer_before_ms();
        let after = rule.buffer_after_ms();
        let reach = range.pad(before, after);

        let blocks = self
            .availability
            .busy_blocks(tenant_id, user_id, reach)
            .await?;
        let interviews = self
            .interviews
            .find_active_for_user(tenant_id, user_id, reach)
            .await?;

        let conflict = blocks
            .iter()
            .map(|b| b.range)
            .chain(
                interviews
                    .iter()
                    .filter(|i| Some(i.id.as_str()) != exclude_interview)
                    .map(|i| i.range),
            )
            .any(|busy| busy.pad(after, before).overlaps(&range));

        Ok(conflict)
    }
}
