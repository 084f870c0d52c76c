// Housekeeping queries against the SQLite file
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use hireloop_core::domain::{JobState, DAY_MS};
use hireloop_core::error::{AppError, Result};
use hireloop_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// DB size in bytes from page_count * page_size
    async fn get_db_size_bytes(&self) -> Result<i64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page count: {}", e)))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page size: {}", e)))?;

        Ok(page_count * page_size)
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

fn to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        let size_before = to_mb(self.get_db_size_bytes().await?);

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("VACUUM failed: {}", e)))?;

        let size_after = to_mb(self.get_db_size_bytes().await?);
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64> {
        let cutoff_time = self.time_provider.now_millis() - retention_days * DAY_MS;

        info!(
            retention_days = retention_days,
            cutoff_time = cutoff_time,
            "Running finished job GC"
        );

        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE state IN (?, ?, ?, ?)
            AND finished_at IS NOT NULL
            AND finished_at < ?
            "#,
        )
        .bind(JobState::Done.to_string())
        .bind(JobState::Failed.to_string())
        .bind(JobState::Superseded.to_string())
        .bind(JobState::Cancelled.to_string())
        .bind(cutoff_time)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Job GC failed: {}", e)))?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_jobs = deleted, "Finished job GC completed");
        Ok(deleted)
    }

    async fn gc_busy_blocks(&self, retention_days: i64) -> Result<i64> {
        let cutoff_time = self.time_provider.now_millis() - retention_days * DAY_MS;

        let result = sqlx::query("DELETE FROM busy_blocks WHERE end_at < ?")
            .bind(cutoff_time)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Busy block GC failed: {}", e)))?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_blocks = deleted, cutoff_time = cutoff_time, "Busy block GC completed");
        Ok(deleted)
    }

    async fn gc_oauth_states(&self) -> Result<i64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("OAuth state GC failed: {}", e)))?;

        Ok(result.rows_affected() as i64)
    }

    async fn gc_rate_limit_counters(&self) -> Result<i64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Rate limit counter GC failed: {}", e)))?;

        Ok(result.rows_affected() as i64)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let db_size_bytes = self.get_db_size_bytes().await?;

        let job_count = self.count("SELECT COUNT(*) FROM jobs").await?;

        let finished_job_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE state IN (?, ?, ?, ?)
            "#,
        )
        .bind(JobState::Done.to_string())
        .bind(JobState::Failed.to_string())
        .bind(JobState::Superseded.to_string())
        .bind(JobState::Cancelled.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let interview_count = self.count("SELECT COUNT(*) FROM interviews").await?;
        let busy_block_count = self.count("SELECT COUNT(*) FROM busy_blocks").await?;

        let freelist_count: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let fragmentation_percent = if page_count > 0 {
            freelist_count as f64 / page_count as f64 * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb: to_mb(db_size_bytes),
            db_size_bytes,
            job_count,
            finished_job_count,
            interview_count,
            busy_block_count,
            fragmentation_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory_repository::tests::seed_tenant_with_user;
    use crate::test_support::memory_pool;
    use crate::{
        SqliteAvailabilityRepository, SqliteConnectionRepository, SqliteCounterStore,
        SqliteJobRepository,
    };
    use hireloop_core::domain::{
        BusyBlock, BusySource, CalendarProvider, Job, JobPayload, JobType, OAuthState, TimeRange,
    };
    use hireloop_core::port::time_provider::mocks::FixedTimeProvider;
    use hireloop_core::port::{
        AvailabilityRepository, ConnectionRepository, CounterStore, JobRepository,
        MaintenanceConfig,
    };

    const NOW: i64 = 1_704_067_200_000;

    #[tokio::test]
    async fn test_maintenance_stats() {
        let pool = memory_pool().await;
        let maintenance = SqliteMaintenance::new(pool, Arc::new(FixedTimeProvider::new(NOW)));

        let stats = maintenance.get_stats().await.unwrap();

        assert!(stats.db_size_mb > 0.0);
        assert_eq!(stats.job_count, 0);
        assert_eq!(stats.finished_job_count, 0);
        assert_eq!(stats.interview_count, 0);
        assert!(stats.fragmentation_percent >= 0.0);
    }

    #[tokio::test]
    async fn test_vacuum() {
        let pool = memory_pool().await;
        let maintenance = SqliteMaintenance::new(pool, Arc::new(FixedTimeProvider::new(NOW)));

        let reclaimed = maintenance.vacuum().await.unwrap();
        assert!(reclaimed >= 0.0);
    }

    #[tokio::test]
    async fn test_gc_finished_jobs() {
        let pool = memory_pool().await;
        let clock = Arc::new(FixedTimeProvider::new(NOW));
        let job_repo = SqliteJobRepository::new(pool.clone(), clock.clone());
        let maintenance = SqliteMaintenance::new(pool, clock);

        let mut old = Job::new_test(
            "acme",
            JobType::SendInvitation,
            "interview:iv-1:invitation",
            1,
            JobPayload::new(serde_json::json!({"interview_id": "iv-1"})),
        );
        old.state = JobState::Done;
        old.finished_at = Some(NOW - 10 * DAY_MS);
        job_repo.insert(&old).await.unwrap();

        let mut recent = old.clone();
        recent.id = "recent".to_string();
        recent.finished_at = Some(NOW - DAY_MS);
        job_repo.insert(&recent).await.unwrap();

        let deleted = maintenance.gc_finished_jobs(7).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(job_repo.find_by_id(&old.id).await.unwrap().is_none());
        assert!(job_repo.find_by_id(&recent.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_maintenance_prunes_blocks_and_states() {
        let pool = memory_pool().await;
        seed_tenant_with_user(&pool, "acme", "u-1").await;
        let clock = Arc::new(FixedTimeProvider::new(NOW));
        let availability = SqliteAvailabilityRepository::new(pool.clone());
        let connections = SqliteConnectionRepository::new(pool.clone());
        let maintenance = SqliteMaintenance::new(pool, clock);

        for (id, end) in [("old", NOW - 40 * DAY_MS), ("fresh", NOW - DAY_MS)] {
            availability
                .insert_busy_block(&BusyBlock {
                    id: id.to_string(),
                    tenant_id: "acme".to_string(),
                    user_id: "u-1".to_string(),
                    range: TimeRange::from_bounds(end - DAY_MS / 24, end),
                    source: BusySource::Manual,
                    external_id: None,
                    title: None,
                    created_at: 0,
                })
                .await
                .unwrap();
        }
        connections
            .save_state(&OAuthState {
                state: "expired".to_string(),
                tenant_id: "acme".to_string(),
                user_id: "u-1".to_string(),
                provider: CalendarProvider::Google,
                expires_at: NOW - 1,
            })
            .await
            .unwrap();

        let report = maintenance
            .run_full_maintenance(&MaintenanceConfig::default(), false)
            .await
            .unwrap();

        assert_eq!(report.busy_blocks_deleted, 1);
        assert_eq!(report.oauth_states_deleted, 1);
        assert!(!report.vacuum_run);
        assert_eq!(report.after.busy_block_count, 1);
        assert!(connections.take_state("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gc_rate_limit_counters_sweeps_quiet_keys() {
        let pool = memory_pool().await;
        let clock = Arc::new(FixedTimeProvider::new(NOW));
        let counters = SqliteCounterStore::new(pool.clone(), clock.clone());
        let maintenance = SqliteMaintenance::new(pool.clone(), clock.clone());

        counters.increment("tenant:quiet", 1, 3, 1_000).await.unwrap();
        counters.increment("tenant:busy", 1, 2, 10_000).await.unwrap();
        clock.advance(1_000);

        assert_eq!(maintenance.gc_rate_limit_counters().await.unwrap(), 1);

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rate_limit_counters")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 1);
        assert_eq!(counters.get("tenant:busy", 1).await.unwrap(), 2);
    }
}
