// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration when no jobs are available (250ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(250);

/// Sleep duration after worker error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default retry base delay (30s); doubled per attempt by the default backoff factor
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 30_000;

/// Default recovery window for orphaned jobs (5 minutes)
pub const DEFAULT_RECOVERY_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Grace period for in-flight work on shutdown (5 seconds)
pub const GRACEFUL_SHUTDOWN_TIMEOUT_MS: i64 = 5000;

/// Default interval of the maintenance scheduler (24 hours)
pub const DEFAULT_MAINTENANCE_INTERVAL_HOURS: u64 = 24;
