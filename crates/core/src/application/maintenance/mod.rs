// Periodic and on-demand housekeeping

use crate::application::worker::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Prunes finished jobs, ended busy blocks and stale OAuth states
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    every: Duration,
}

impl MaintenanceScheduler {
    pub fn new(
        maintenance: Arc<dyn Maintenance>,
        config: MaintenanceConfig,
        interval_hours: u64,
    ) -> Self {
        Self {
            maintenance,
            config,
            every: Duration::from_secs(interval_hours.max(1) * 3600),
        }
    }

    /// Loop until shutdown. The first pass runs right away.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            every_secs = self.every.as_secs(),
            job_retention_days = self.config.finished_job_retention_days,
            busy_block_retention_days = self.config.busy_block_retention_days,
            "Maintenance scheduler started"
        );

        let mut tick = interval(self.every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }
            if shutdown.is_shutdown() {
                break;
            }

            if let Err(e) = self.pass(false).await {
                error!(error = %e, "Scheduled maintenance failed");
            }
        }

        info!("Maintenance scheduler stopped");
    }

    /// Manual trigger from admin.maintenance
    pub async fn run_now(&self, force_vacuum: bool) -> Result<MaintenanceReport> {
        self.pass(force_vacuum).await
    }

    async fn pass(&self, force_vacuum: bool) -> Result<MaintenanceReport> {
        let report = self
            .maintenance
            .run_full_maintenance(&self.config, force_vacuum)
            .await?;

        info!(
            jobs_deleted = report.jobs_deleted,
            busy_blocks_deleted = report.busy_blocks_deleted,
            oauth_states_deleted = report.oauth_states_deleted,
            rate_limit_counters_deleted = report.rate_limit_counters_deleted,
            vacuum_run = report.vacuum_run,
            db_size_mb = report.after.db_size_mb,
            "Maintenance pass completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MaintenanceStats;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingStore {
        calls: Mutex<Vec<String>>,
    }

    impl CountingStore {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn stats(db_size_mb: f64) -> MaintenanceStats {
        MaintenanceStats {
            db_size_mb,
            db_size_bytes: (db_size_mb * 1024.0 * 1024.0) as i64,
            job_count: 0,
            finished_job_count: 0,
            interview_count: 0,
            busy_block_count: 0,
            fragmentation_percent: 0.0,
        }
    }

    #[async_trait]
    impl Maintenance for CountingStore {
        async fn vacuum(&self) -> Result<f64> {
            self.record("vacuum".to_string());
            Ok(1.5)
        }

        async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64> {
            self.record(format!("jobs:{}", retention_days));
            Ok(3)
        }

        async fn gc_busy_blocks(&self, retention_days: i64) -> Result<i64> {
            self.record(format!("blocks:{}", retention_days));
            Ok(2)
        }

        async fn gc_oauth_states(&self) -> Result<i64> {
            self.record("states".to_string());
            Ok(1)
        }

        async fn gc_rate_limit_counters(&self) -> Result<i64> {
            self.record("counters".to_string());
            Ok(4)
        }

        async fn get_stats(&self) -> Result<MaintenanceStats> {
            Ok(stats(10.0))
        }
    }

    #[tokio::test]
    async fn test_run_now_collects_without_vacuum_under_limit() {
        let store = Arc::new(CountingStore::default());
        let scheduler = MaintenanceScheduler::new(store.clone(), MaintenanceConfig::default(), 24);

        let report = scheduler.run_now(false).await.unwrap();

        assert_eq!(report.jobs_deleted, 3);
        assert_eq!(report.busy_blocks_deleted, 2);
        assert_eq!(report.oauth_states_deleted, 1);
        assert_eq!(report.rate_limit_counters_deleted, 4);
        assert!(!report.vacuum_run);
        assert_eq!(
            store.calls(),
            vec!["jobs:7", "blocks:30", "states", "counters"]
        );
    }

    #[tokio::test]
    async fn test_vacuum_when_forced_or_over_limit() {
        let store = Arc::new(CountingStore::default());
        let scheduler = MaintenanceScheduler::new(store.clone(), MaintenanceConfig::default(), 24);
        let report = scheduler.run_now(true).await.unwrap();
        assert!(report.vacuum_run);
        assert_eq!(report.reclaimed_mb, 1.5);

        let small_limit = MaintenanceConfig {
            max_db_size_mb: 5.0,
            ..MaintenanceConfig::default()
        };
        let scheduler = MaintenanceScheduler::new(store.clone(), small_limit, 24);
        assert!(scheduler.run_now(false).await.unwrap().vacuum_run);
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let store = Arc::new(CountingStore::default());
        let scheduler = MaintenanceScheduler::new(store.clone(), MaintenanceConfig::default(), 24);
        let (tx, token) = crate::application::shutdown_channel();

        let handle = tokio::spawn(scheduler.run(token));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(store.calls().contains(&"states".to_string()));
    }
}
