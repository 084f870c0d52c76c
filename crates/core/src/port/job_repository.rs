// Job Repository Port (Interface)

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Job persistence
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Update job
    async fn update(&self, job: &Job) -> Result<()>;

    /// Pop next due job from queue (priority, then FIFO), atomically marking it RUNNING
    async fn pop_next(&self, queue: &str) -> Result<Option<Job>>;

    /// Highest generation ever issued on a subject, 0 if none
    async fn latest_generation(&self, subject_key: &str) -> Result<i64>;

    /// Queued jobs on a subject older than `generation` become SUPERSEDED
    async fn supersede_older(&self, subject_key: &str, generation: i64) -> Result<u64>;

    /// Cancel every still-queued job of a subject
    async fn cancel_queued(&self, subject_key: &str) -> Result<u64>;

    /// Count jobs by state
    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64>;

    /// Find all jobs by state (for recovery)
    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>>;

    /// Jobs of a subject, oldest generation first
    async fn find_by_subject(&self, subject_key: &str) -> Result<Vec<Job>>;
}
