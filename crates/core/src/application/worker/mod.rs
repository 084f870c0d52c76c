// Queue worker: claim, execute, settle

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::Job;
use crate::error::Result;
use crate::port::{ExecutionError, ExecutionResult, JobRepository, TaskExecutor, TimeProvider};
use std::sync::Arc;
use tokio::task::JoinError;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Drains one named queue; several may share a queue
pub struct Worker {
    queue: String,
    job_repo: Arc<dyn JobRepository>,
    task_executor: Arc<dyn TaskExecutor>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        job_repo: Arc<dyn JobRepository>,
        task_executor: Arc<dyn TaskExecutor>,
        retry_policy: Arc<RetryPolicy>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue: queue.into(),
            job_repo,
            task_executor,
            retry_policy,
            time_provider,
        }
    }

    /// Loop until shutdown; a job already claimed is always settled first
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, "Worker started");

        while !shutdown.is_shutdown() {
            let pause = match self.process_next_job().await {
                Ok(true) => continue,
                Ok(false) => IDLE_SLEEP_DURATION,
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "Worker error");
                    ERROR_RECOVERY_SLEEP_DURATION
                }
            };
            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!(queue = %self.queue, "Worker stopped");
        Ok(())
    }

    /// Claim and run one due job; `false` when nothing is due
    pub async fn process_next_job(&self) -> Result<bool> {
        let Some(job) = self.job_repo.pop_next(&self.queue).await? else {
            return Ok(false);
        };

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            subject = %job.subject_key,
            tenant_id = %job.tenant_id,
            attempt = job.attempts + 1,
            "Processing job"
        );

        // Own task so a panicking executor cannot take the worker down
        let executor = Arc::clone(&self.task_executor);
        let claimed = job.clone();
        let outcome = tokio::task::spawn(async move { executor.execute(&claimed).await }).await;

        let job = self.settle(job, outcome)?;
        self.job_repo.update(&job).await?;
        Ok(true)
    }

    /// Apply the executor outcome to the claimed job
    fn settle(
        &self,
        mut job: Job,
        outcome: std::result::Result<
            std::result::Result<ExecutionResult, ExecutionError>,
            JoinError,
        >,
    ) -> Result<Job> {
        let now = self.time_provider.now_millis();

        match outcome {
            Ok(Ok(result)) => {
                job.complete(now)?;
                info!(
                    job_id = %job.id,
                    status = ?result.status,
                    detail = result.detail.as_deref().unwrap_or(""),
                    duration_ms = result.duration_ms,
                    "Job completed"
                );
            }
            Ok(Err(e)) => {
                job.attempts += 1;
                match self.retry_policy.should_retry(&job) {
                    RetryDecision::Retry(delay_ms) => {
                        warn!(
                            job_id = %job.id,
                            attempt = job.attempts,
                            delay_ms,
                            error = %e,
                            "Job failed, retrying later"
                        );
                        self.retry_policy.prepare_for_retry(&mut job, delay_ms, e.to_string());
                    }
                    RetryDecision::Failed => {
                        error!(job_id = %job.id, attempts = job.attempts, error = %e, "Job failed for good");
                        job.fail(now, e.to_string());
                    }
                }
            }
            // Panics and aborts are not retried
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "executor panicked"
                } else {
                    "executor task cancelled"
                };
                error!(job_id = %job.id, error = ?join_err, "{}", reason);
                job.fail(now, reason);
            }
        }

        Ok(job)
    }
}
