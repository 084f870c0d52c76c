// Job Service - enqueue, cancel, execute background work

pub mod enqueue;
pub mod executor;

pub use enqueue::EnqueueRequest;
pub use executor::SchedulingTaskExecutor;

use crate::domain::Job;
use crate::error::Result;
use crate::port::{IdProvider, JobRepository, TimeProvider, TransactionalJobRepository};
use std::sync::Arc;
use tracing::info;

pub struct JobService {
    tx_repo: Arc<dyn TransactionalJobRepository>,
    job_repo: Arc<dyn JobRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobService {
    pub fn new(
        tx_repo: Arc<dyn TransactionalJobRepository>,
        job_repo: Arc<dyn JobRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            tx_repo,
            job_repo,
            id_provider,
            time_provider,
        }
    }

    /// Enqueue a new job, superseding queued jobs of the same subject
    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<Job> {
        let job = enqueue::execute(
            self.tx_repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await?;

        info!(
            job_id = %job.id,
            tenant_id = %job.tenant_id,
            job_type = %job.job_type,
            subject_key = %job.subject_key,
            generation = job.generation,
            schedule_at = ?job.schedule_at,
            "Job enqueued"
        );
        Ok(job)
    }

    /// Cancel every queued job of a subject
    pub async fn cancel_subject(&self, subject_key: &str) -> Result<u64> {
        let cancelled = self.job_repo.cancel_queued(subject_key).await?;
        if cancelled > 0 {
            info!(subject_key = %subject_key, cancelled, "Queued jobs cancelled");
        }
        Ok(cancelled)
    }
}
