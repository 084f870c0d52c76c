// SQLite JobRepository Implementation

use crate::error::{map_sqlx_error, parse_column};
use crate::SqliteJobTransaction;
use async_trait::async_trait;
use hireloop_core::domain::{Job, JobId, JobPayload, JobState, JobType};
use hireloop_core::error::Result;
use hireloop_core::port::{
    JobRepository, JobRepositoryTransaction, TimeProvider, TransactionalJobRepository,
};
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;

pub struct SqliteJobRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

// Statements shared by the pool-backed repository and SqliteJobTransaction

pub(crate) async fn insert_job<'e, E>(executor: E, job: &Job) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, tenant_id, queue, job_type, subject_key, generation,
            priority, state, created_at, started_at, finished_at,
            payload, attempts, max_attempts, backoff_factor,
            schedule_at, last_error
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&job.id)
    .bind(&job.tenant_id)
    .bind(&job.queue)
    .bind(job.job_type.to_string())
    .bind(&job.subject_key)
    .bind(job.generation)
    .bind(job.priority)
    .bind(job.state.to_string())
    .bind(job.created_at)
    .bind(job.started_at)
    .bind(job.finished_at)
    .bind(job.payload.as_value().to_string())
    .bind(job.attempts)
    .bind(job.max_attempts)
    .bind(job.backoff_factor)
    .bind(job.schedule_at)
    .bind(&job.last_error)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(crate) async fn supersede_below<'e, E>(
    executor: E,
    subject_key: &str,
    below_generation: i64,
    now: i64,
) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = ?, finished_at = ?
        WHERE subject_key = ? AND generation < ? AND state = ?
        "#,
    )
    .bind(JobState::Superseded.to_string())
    .bind(now)
    .bind(subject_key)
    .bind(below_generation)
    .bind(JobState::Queued.to_string())
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}

pub(crate) async fn record_generation<'e, E>(
    executor: E,
    subject_key: &str,
    generation: i64,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO subjects (subject_key, latest_generation) VALUES (?, ?)
        ON CONFLICT(subject_key) DO UPDATE SET
            latest_generation = MAX(latest_generation, excluded.latest_generation)
        "#,
    )
    .bind(subject_key)
    .bind(generation)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(crate) async fn latest_generation<'e, E>(executor: E, subject_key: &str) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let gen: Option<i64> =
        sqlx::query_scalar("SELECT latest_generation FROM subjects WHERE subject_key = ?")
            .bind(subject_key)
            .fetch_optional(executor)
            .await
            .map_err(map_sqlx_error)?;

    Ok(gen.unwrap_or(0))
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> Result<()> {
        insert_job(&self.pool, job).await
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, priority = ?, started_at = ?, finished_at = ?,
                attempts = ?, schedule_at = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.priority)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.attempts)
        .bind(job.schedule_at)
        .bind(&job.last_error)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn pop_next(&self, queue: &str) -> Result<Option<Job>> {
        // Pop-time supersede: only the latest generation of a subject is runnable,
        // and only once its schedule_at has passed
        let now = self.time_provider.now_millis();

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = ?, started_at = ?
            WHERE id = (
                SELECT j.id FROM jobs j
                WHERE j.queue = ? AND j.state = ?
                  AND (j.schedule_at IS NULL OR j.schedule_at <= ?)
                  AND j.generation = (
                      SELECT MAX(generation)
                      FROM jobs
                      WHERE subject_key = j.subject_key
                  )
                ORDER BY j.priority DESC, j.created_at ASC, j.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(JobState::Running.to_string())
        .bind(now)
        .bind(queue)
        .bind(JobState::Queued.to_string())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn latest_generation(&self, subject_key: &str) -> Result<i64> {
        latest_generation(&self.pool, subject_key).await
    }

    async fn supersede_older(&self, subject_key: &str, generation: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let count = supersede_below(&self.pool, subject_key, generation, now).await?;
        record_generation(&self.pool, subject_key, generation).await?;
        Ok(count)
    }

    async fn cancel_queued(&self, subject_key: &str) -> Result<u64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, finished_at = ?
            WHERE subject_key = ? AND state = ?
            "#,
        )
        .bind(JobState::Cancelled.to_string())
        .bind(now)
        .bind(subject_key)
        .bind(JobState::Queued.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ? AND state = ?")
                .bind(queue)
                .bind(state.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn find_by_subject(&self, subject_key: &str) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE subject_key = ?
            ORDER BY generation ASC, created_at ASC
            "#,
        )
        .bind(subject_key)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

#[async_trait]
impl TransactionalJobRepository for SqliteJobRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn JobRepositoryTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteJobTransaction::new(
            tx,
            Arc::clone(&self.time_provider),
        )))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    tenant_id: String,
    queue: String,
    job_type: String,
    subject_key: String,
    generation: i64,
    priority: i32,
    state: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    payload: String,
    attempts: i32,
    max_attempts: i32,
    backoff_factor: f64,
    schedule_at: Option<i64>,
    last_error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let state: JobState = parse_column("jobs.state", &self.state)?;
        let job_type: JobType = parse_column("jobs.job_type", &self.job_type)?;
        let payload: serde_json::Value = serde_json::from_str(&self.payload)?;

        Ok(Job {
            id: self.id,
            tenant_id: self.tenant_id,
            queue: self.queue,
            job_type,
            subject_key: self.subject_key,
            generation: self.generation,
            priority: self.priority,
            state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            payload: JobPayload::new(payload),
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            schedule_at: self.schedule_at,
            last_error: self.last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use hireloop_core::port::time_provider::mocks::FixedTimeProvider;

    const NOW: i64 = 1_704_067_200_000;

    async fn setup_test_db() -> (SqliteJobRepository, Arc<FixedTimeProvider>) {
        let pool = memory_pool().await;
        let clock = Arc::new(FixedTimeProvider::new(NOW));
        (SqliteJobRepository::new(pool, clock.clone()), clock)
    }

    fn invitation(subject: &str, generation: i64) -> Job {
        Job::new_test(
            "tenant-1",
            JobType::SendInvitation,
            subject,
            generation,
            JobPayload::new(serde_json::json!({"interview_id": "iv-1"})),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (repo, _) = setup_test_db().await;
        let job = invitation("interview:iv-1:invitation", 1);

        repo.insert(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.tenant_id, "tenant-1");
        assert_eq!(found.job_type, JobType::SendInvitation);
        assert_eq!(found.queue, "notifications");
        assert_eq!(found.state, JobState::Queued);
        assert_eq!(found.payload.as_value()["interview_id"], "iv-1");
    }

    #[tokio::test]
    async fn test_pop_next_prefers_priority() {
        let (repo, _) = setup_test_db().await;

        let mut low = invitation("subject1", 1);
        low.priority = 0;
        let mut high = invitation("subject2", 1);
        high.priority = 10;

        repo.insert(&low).await.unwrap();
        repo.insert(&high).await.unwrap();

        let popped = repo.pop_next("notifications").await.unwrap().unwrap();
        assert_eq!(popped.id, high.id);
        assert_eq!(popped.state, JobState::Running);
        assert_eq!(popped.started_at, Some(NOW));
    }

    #[tokio::test]
    async fn test_pop_next_waits_for_schedule_at() {
        let (repo, clock) = setup_test_db().await;

        let mut reminder = invitation("interview:iv-1:reminder", 1);
        reminder.schedule_at = Some(NOW + 60_000);
        repo.insert(&reminder).await.unwrap();

        assert!(repo.pop_next("notifications").await.unwrap().is_none());

        clock.advance(60_000);
        let popped = repo.pop_next("notifications").await.unwrap().unwrap();
        assert_eq!(popped.id, reminder.id);
    }

    #[tokio::test]
    async fn test_pop_next_skips_other_queue() {
        let (repo, _) = setup_test_db().await;
        repo.insert(&invitation("s", 1)).await.unwrap();

        assert!(repo.pop_next("sync").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_supersede() {
        let (repo, _) = setup_test_db().await;

        for gen in 1..=3 {
            repo.insert(&invitation("same::subject", gen)).await.unwrap();
        }

        let count = repo.supersede_older("same::subject", 3).await.unwrap();
        assert_eq!(count, 2);

        let queued = repo
            .count_by_state("notifications", JobState::Queued)
            .await
            .unwrap();
        assert_eq!(queued, 1);
        assert_eq!(repo.latest_generation("same::subject").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pop_ignores_older_generation() {
        let (repo, _) = setup_test_db().await;

        let old = invitation("subject", 1);
        let new = invitation("subject", 2);
        repo.insert(&old).await.unwrap();
        repo.insert(&new).await.unwrap();

        let popped = repo.pop_next("notifications").await.unwrap().unwrap();
        assert_eq!(popped.id, new.id);
        assert!(repo.pop_next("notifications").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_queued_leaves_finished_jobs() {
        let (repo, _) = setup_test_db().await;

        let mut done = invitation("interview:iv-1:reminder", 1);
        done.state = JobState::Done;
        repo.insert(&done).await.unwrap();
        repo.insert(&invitation("interview:iv-1:reminder", 2))
            .await
            .unwrap();

        let cancelled = repo.cancel_queued("interview:iv-1:reminder").await.unwrap();
        assert_eq!(cancelled, 1);

        let jobs = repo.find_by_subject("interview:iv-1:reminder").await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].state, JobState::Done);
        assert_eq!(jobs[1].state, JobState::Cancelled);
        assert_eq!(jobs[1].finished_at, Some(NOW));
    }

    #[tokio::test]
    async fn test_update_round_trips_retry_fields() {
        let (repo, _) = setup_test_db().await;
        repo.insert(&invitation("s", 1)).await.unwrap();

        let mut job = repo.pop_next("notifications").await.unwrap().unwrap();
        job.state = JobState::Queued;
        job.attempts = 1;
        job.started_at = None;
        job.schedule_at = Some(NOW + 30_000);
        job.last_error = Some("smtp down".to_string());
        repo.update(&job).await.unwrap();

        let stored = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.schedule_at, Some(NOW + 30_000));
        assert_eq!(stored.last_error.as_deref(), Some("smtp down"));
        assert_eq!(
            repo.find_by_state(JobState::Queued).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_latest_generation_defaults_to_zero() {
        let (repo, _) = setup_test_db().await;
        assert_eq!(repo.latest_generation("unknown").await.unwrap(), 0);
    }
}
