// Domain Layer - Pure business logic and entities

pub mod availability;
pub mod calendar;
pub mod directory;
pub mod error;
pub mod interview;
pub mod job;
pub mod queue;
pub mod rule;
pub mod slot;
pub mod time_range;

// Re-exports
pub use availability::{BusyBlock, BusyBlockId, BusySource, WorkingHours};
pub use calendar::{
    CalendarConnection, CalendarProvider, ConnectionId, ConnectionStatus, OAuthState, OAuthTokens,
};
pub use directory::{Candidate, CandidateId, Tenant, TenantId, User, UserId, UserRole};
pub use error::DomainError;
pub use interview::{Interview, InterviewId, InterviewState};
pub use job::{
    Generation, InterviewJobPayload, Job, JobId, JobPayload, JobState, JobType, Priority,
    SubjectKey, SyncJobPayload,
};
pub use queue::{QueueConfig, QueueId, NOTIFICATIONS_QUEUE, SYNC_QUEUE};
pub use rule::SchedulingRule;
pub use slot::SlotSuggestion;
pub use time_range::{TimeRange, DAY_MS, HOUR_MS, MAX_INSTANT, MINUTE_MS, MIN_INSTANT};
