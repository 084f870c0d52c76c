// Enqueue Use Case

use crate::domain::{Job, JobPayload, JobType, Priority};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider, TransactionalJobRepository};
use serde::{Deserialize, Serialize};

pub const MAX_SUBJECT_KEY_LEN: usize = 256;
pub const PRIORITY_RANGE: std::ops::RangeInclusive<Priority> = -100..=100;

/// Enqueue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub tenant_id: String,
    pub job_type: JobType,
    pub subject_key: String,
    pub payload: serde_json::Value,

    #[serde(default)]
    pub priority: Priority,

    /// Earliest run time (epoch ms); `None` runs as soon as a worker is free
    #[serde(default)]
    pub schedule_at: Option<i64>,
}

pub(crate) fn validate_request(req: &EnqueueRequest) -> Result<()> {
    if req.subject_key.trim().is_empty() {
        return Err(AppError::Validation("Subject key cannot be empty".to_string()));
    }
    if req.subject_key.len() > MAX_SUBJECT_KEY_LEN {
        return Err(AppError::Validation(format!(
            "Subject key too long (max {} characters)",
            MAX_SUBJECT_KEY_LEN
        )));
    }
    if !PRIORITY_RANGE.contains(&req.priority) {
        return Err(AppError::Validation(format!(
            "Priority {} out of range ({}..={})",
            req.priority,
            PRIORITY_RANGE.start(),
            PRIORITY_RANGE.end()
        )));
    }
    Ok(())
}

/// Execute enqueue use case (with transaction for atomicity)
///
/// The new job takes generation `latest + 1`; queued jobs of older
/// generations on the same subject are superseded.
pub async fn execute(
    job_repo: &dyn TransactionalJobRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: EnqueueRequest,
) -> Result<Job> {
    validate_request(&req)?;

    let mut tx = job_repo.begin_transaction().await?;
    let generation = tx.next_generation(&req.subject_key).await?;

    let mut job = Job::new(
        id_provider.generate_id(),
        time_provider.now_millis(),
        req.tenant_id,
        req.job_type,
        req.subject_key.clone(),
        generation,
        JobPayload::new(req.payload),
    );
    job.priority = req.priority;
    job.schedule_at = req.schedule_at;

    tx.insert(&job).await?;
    tx.supersede_older(&req.subject_key, generation).await?;
    tx.commit().await?;

    Ok(job)
}
