//! RPC Request/Response Types
//!
//! Method parameters and results. Requests whose shape matches a core use
//! case reuse the core request type directly.

use hireloop_core::domain::{
    BusyBlock, CalendarConnection, CalendarProvider, ConnectionStatus, SchedulingRule,
    SlotSuggestion, User, WorkingHours,
};
use hireloop_core::port::MaintenanceReport;
use serde::{Deserialize, Serialize};

pub use hireloop_core::application::directory::{
    AddBusyBlockRequest, CreateCandidateRequest, CreateUserRequest, WorkingHoursEntry,
};
pub use hireloop_core::application::{ScheduleInterviewRequest, SuggestSlotsRequest};

/// tenant.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
}

/// Params of methods that only need the tenant (user.list.v1, rules.get.v1)
#[derive(Debug, Deserialize)]
pub struct TenantRequest {
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
}

/// availability.working_hours.set.v1
#[derive(Debug, Deserialize)]
pub struct SetWorkingHoursRequest {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default)]
    pub entries: Vec<WorkingHoursEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkingHoursResponse {
    pub user_id: String,
    pub working_hours: Vec<WorkingHours>,
}

/// availability.busy.remove.v1
#[derive(Debug, Deserialize)]
pub struct RemoveBusyBlockRequest {
    pub tenant_id: String,
    pub block_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveBusyBlockResponse {
    pub block_id: String,
    pub removed: bool,
}

/// availability.busy.list.v1
#[derive(Debug, Deserialize)]
pub struct ListBusyBlocksRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListBusyBlocksResponse {
    pub blocks: Vec<BusyBlock>,
}

/// rules.set.v1 - omitted fields keep their current value
#[derive(Debug, Default, Deserialize)]
pub struct SetRuleRequest {
    pub tenant_id: String,
    pub min_notice_minutes: Option<u32>,
    pub buffer_before_minutes: Option<u32>,
    pub buffer_after_minutes: Option<u32>,
    pub slot_increment_minutes: Option<u32>,
    pub max_days_ahead: Option<u32>,
    pub max_interviews_per_day: Option<u32>,
    pub max_suggestions: Option<u32>,
    pub max_slots_per_day: Option<u32>,
    pub reminder_lead_minutes: Option<u32>,
}

impl SetRuleRequest {
    pub fn apply_to(self, mut rule: SchedulingRule) -> SchedulingRule {
        fn set(field: &mut u32, value: Option<u32>) {
            if let Some(v) = value {
                *field = v;
            }
        }
        set(&mut rule.min_notice_minutes, self.min_notice_minutes);
        set(&mut rule.buffer_before_minutes, self.buffer_before_minutes);
        set(&mut rule.buffer_after_minutes, self.buffer_after_minutes);
        set(&mut rule.slot_increment_minutes, self.slot_increment_minutes);
        set(&mut rule.max_days_ahead, self.max_days_ahead);
        set(&mut rule.max_interviews_per_day, self.max_interviews_per_day);
        set(&mut rule.max_suggestions, self.max_suggestions);
        set(&mut rule.max_slots_per_day, self.max_slots_per_day);
        set(&mut rule.reminder_lead_minutes, self.reminder_lead_minutes);
        rule
    }
}

/// slots.suggest.v1
#[derive(Debug, Clone, Serialize)]
pub struct SuggestSlotsResponse {
    pub slots: Vec<SlotSuggestion>,
}

/// interview.reschedule.v1
#[derive(Debug, Deserialize)]
pub struct RescheduleInterviewRequest {
    pub tenant_id: String,
    pub interview_id: String,
    pub start: i64,
    pub end: i64,
}

/// interview.confirm/complete/cancel/get.v1
#[derive(Debug, Deserialize)]
pub struct InterviewRequest {
    pub tenant_id: String,
    pub interview_id: String,
}

/// oauth.authorize.v1
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub provider: CalendarProvider,
}

/// oauth.callback.v1 - the state identifies tenant and user
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub state: String,
    pub code: String,
}

/// calendar.disconnect.v1 / calendar.sync.v1
#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    pub tenant_id: String,
    pub connection_id: String,
}

/// A calendar connection without its tokens
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    pub connection_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub provider: CalendarProvider,
    pub status: ConnectionStatus,
    pub expires_at: Option<i64>,
    pub last_synced_at: Option<i64>,
}

impl From<CalendarConnection> for ConnectionResponse {
    fn from(c: CalendarConnection) -> Self {
        Self {
            connection_id: c.id,
            tenant_id: c.tenant_id,
            user_id: c.user_id,
            provider: c.provider,
            status: c.status,
            expires_at: c.expires_at,
            last_synced_at: c.last_synced_at,
        }
    }
}

/// admin.stats.v1 - Get system statistics
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct QueueDepth {
    pub queue: String,
    pub queued: i64,
    pub running: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub queues: Vec<QueueDepth>,
    pub total_jobs: i64,
    pub finished_jobs: i64,
    pub interviews: i64,
    pub busy_blocks: i64,
    pub db_size_bytes: i64,
    pub fragmentation_percent: f64,
    pub uptime_seconds: i64,
}

/// admin.maintenance.v1 - Run manual maintenance
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResponse {
    pub vacuum_run: bool,
    pub reclaimed_mb: f64,
    pub jobs_deleted: i64,
    pub busy_blocks_deleted: i64,
    pub oauth_states_deleted: i64,
    pub rate_limit_counters_deleted: i64,
    pub db_size_before: i64,
    pub db_size_after: i64,
}

impl From<MaintenanceReport> for MaintenanceResponse {
    fn from(report: MaintenanceReport) -> Self {
        Self {
            vacuum_run: report.vacuum_run,
            reclaimed_mb: report.reclaimed_mb,
            jobs_deleted: report.jobs_deleted,
            busy_blocks_deleted: report.busy_blocks_deleted,
            oauth_states_deleted: report.oauth_states_deleted,
            rate_limit_counters_deleted: report.rate_limit_counters_deleted,
            db_size_before: report.before.db_size_bytes,
            db_size_after: report.after.db_size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rule_keeps_omitted_fields() {
        let req: SetRuleRequest = serde_json::from_value(serde_json::json!({
            "tenant_id": "acme",
            "min_notice_minutes": 60,
            "buffer_before_minutes": 15
        }))
        .unwrap();

        let current = SchedulingRule::default_for("acme");
        let updated = req.apply_to(current.clone());

        assert_eq!(updated.min_notice_minutes, 60);
        assert_eq!(updated.buffer_before_minutes, 15);
        assert_eq!(updated.buffer_after_minutes, current.buffer_after_minutes);
        assert_eq!(updated.max_suggestions, current.max_suggestions);
    }

    #[test]
    fn test_authorize_request_parses_provider() {
        let req: AuthorizeRequest = serde_json::from_value(serde_json::json!({
            "tenant_id": "acme",
            "user_id": "u-1",
            "provider": "GOOGLE"
        }))
        .unwrap();
        assert_eq!(req.provider, CalendarProvider::Google);
    }

    #[test]
    fn test_connection_response_hides_tokens() {
        let conn = CalendarConnection {
            id: "conn-1".to_string(),
            tenant_id: "acme".to_string(),
            user_id: "u-1".to_string(),
            provider: CalendarProvider::Microsoft,
            access_token: Some("secret-access".to_string()),
            refresh_token: Some("secret-refresh".to_string()),
            expires_at: Some(1),
            status: ConnectionStatus::Active,
            last_synced_at: None,
            created_at: 0,
            updated_at: 0,
        };

        let json = serde_json::to_string(&ConnectionResponse::from(conn)).unwrap();
        assert!(json.contains("conn-1"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_empty_stats_params() {
        let _: StatsRequest = serde_json::from_value(serde_json::json!({})).unwrap();
    }
}
