// Application Layer - Use Cases and Business Logic

pub mod availability;
pub mod calendar;
pub mod directory;
pub mod interviews;
pub mod jobs;
pub mod keyed_lock;
pub mod maintenance;
pub mod rate_limit;
pub mod recovery;
pub mod retry;
pub mod worker;

// Re-exports
pub use availability::{AvailabilityReader, SlotService, SuggestSlotsRequest};
pub use calendar::{
    AuthorizationStart, CalendarSyncScheduler, CalendarSyncService, ProviderRegistry,
    SyncOutcome, TokenService,
};
pub use directory::DirectoryService;
pub use interviews::{InterviewService, ScheduleInterviewRequest};
pub use jobs::{JobService, SchedulingTaskExecutor};
pub use keyed_lock::KeyedLock;
pub use maintenance::MaintenanceScheduler;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, WeightedRateLimiter};
pub use recovery::RecoveryService;
pub use retry::{RetryDecision, RetryPolicy};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
