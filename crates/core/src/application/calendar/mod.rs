// External calendars: OAuth lifecycle and busy-time sync

pub mod oauth;
pub mod sync;

pub use oauth::{AuthorizationStart, ProviderRegistry, TokenService};
pub use sync::{CalendarSyncScheduler, CalendarSyncService, SyncOutcome};
