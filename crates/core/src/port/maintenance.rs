// Storage housekeeping port
use crate::error::Result;
use async_trait::async_trait;

/// Row counts and file size of the store
#[derive(Debug, Clone)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub finished_job_count: i64,
    pub interview_count: i64,
    pub busy_block_count: i64,
    pub fragmentation_percent: f64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// DONE / FAILED / SUPERSEDED / CANCELLED jobs older than this are deleted
    pub finished_job_retention_days: i64,

    /// Busy blocks that ended longer ago than this are deleted
    pub busy_block_retention_days: i64,

    /// VACUUM runs on its own once the file grows past this
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            finished_job_retention_days: 7,
            busy_block_retention_days: 30,
            max_db_size_mb: 1000.0,
        }
    }
}

/// What one maintenance pass removed
#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    pub jobs_deleted: i64,
    pub busy_blocks_deleted: i64,
    pub oauth_states_deleted: i64,
    pub rate_limit_counters_deleted: i64,
    pub vacuum_run: bool,
    pub reclaimed_mb: f64,
    pub before: MaintenanceStats,
    pub after: MaintenanceStats,
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Returns the space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64>;

    async fn gc_busy_blocks(&self, retention_days: i64) -> Result<i64>;

    /// Authorizations whose redirect never came back
    async fn gc_oauth_states(&self) -> Result<i64>;

    /// Counters past their TTL, including keys that went quiet
    async fn gc_rate_limit_counters(&self) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// All collectors, then VACUUM if forced or the file is over the limit
    async fn run_full_maintenance(
        &self,
        config: &MaintenanceConfig,
        force_vacuum: bool,
    ) -> Result<MaintenanceReport> {
        let before = self.get_stats().await?;

        let jobs_deleted = self
            .gc_finished_jobs(config.finished_job_retention_days)
            .await?;
        let busy_blocks_deleted = self.gc_busy_blocks(config.busy_block_retention_days).await?;
        let oauth_states_deleted = self.gc_oauth_states().await?;
        let rate_limit_counters_deleted = self.gc_rate_limit_counters().await?;

        let vacuum_run = force_vacuum || before.db_size_mb > config.max_db_size_mb;
        let reclaimed_mb = if vacuum_run { self.vacuum().await? } else { 0.0 };

        let after = self.get_stats().await?;

        Ok(MaintenanceReport {
            jobs_deleted,
            busy_blocks_deleted,
            oauth_states_deleted,
            rate_limit_counters_deleted,
            vacuum_run,
            reclaimed_mb,
            before,
            after,
        })
    }
}
