// Startup recovery of jobs a stopped daemon left RUNNING
use crate::application::worker::constants::DEFAULT_RECOVERY_WINDOW_MS;
use crate::domain::{Job, JobState};
use crate::error::Result;
use crate::port::{JobRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

const INTERRUPTED: &str = "interrupted by daemon shutdown";

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    /// Started inside the window; another process may still own it
    Live,
    Requeued,
    Exhausted,
    /// RUNNING without a start time
    Corrupt,
}

/// Decide what happens to one RUNNING job and apply it to `job`
///
/// The interrupted run counts as an attempt, so a notice that keeps
/// crashing the daemon cannot loop forever.
fn recover(job: &mut Job, now: i64, cutoff: i64) -> Verdict {
    let Some(started_at) = job.started_at else {
        job.fail(now, "running without start time");
        return Verdict::Corrupt;
    };
    if started_at >= cutoff {
        return Verdict::Live;
    }

    job.attempts += 1;
    if job.attempts >= job.max_attempts {
        job.fail(now, format!("{}, attempts exhausted", INTERRUPTED));
        return Verdict::Exhausted;
    }

    job.state = JobState::Queued;
    job.started_at = None;
    job.schedule_at = None;
    job.last_error = Some(INTERRUPTED.to_string());
    Verdict::Requeued
}

pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
    recovery_window_ms: i64,
}

impl RecoveryService {
    /// `recovery_window_ms` defaults to five minutes
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        recovery_window_ms: Option<i64>,
    ) -> Self {
        Self {
            job_repo,
            time_provider,
            recovery_window_ms: recovery_window_ms.unwrap_or(DEFAULT_RECOVERY_WINDOW_MS),
        }
    }

    /// Requeue or fail RUNNING jobs older than the window; returns how many changed
    pub async fn recover_orphaned_jobs(&self) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.recovery_window_ms;

        let mut changed = 0;
        for mut job in self.job_repo.find_by_state(JobState::Running).await? {
            match recover(&mut job, now, cutoff) {
                Verdict::Live => continue,
                Verdict::Requeued => {
                    info!(job_id = %job.id, queue = %job.queue, attempts = job.attempts, "Orphaned job requeued")
                }
                Verdict::Exhausted => {
                    warn!(job_id = %job.id, queue = %job.queue, attempts = job.attempts, "Orphaned job failed")
                }
                Verdict::Corrupt => {
                    warn!(job_id = %job.id, "RUNNING job without started_at marked FAILED")
                }
            }
            self.job_repo.update(&job).await?;
            changed += 1;
        }

        info!(changed, cutoff, "Orphaned job recovery complete");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobPayload, JobType};

    const NOW: i64 = 1_704_067_200_000;
    const CUTOFF: i64 = NOW - DEFAULT_RECOVERY_WINDOW_MS;

    fn running(started_at: Option<i64>, attempts: i32) -> Job {
        let mut job = Job::new_test(
            "acme",
            JobType::SendReminder,
            "interview:iv-1:reminder",
            1,
            JobPayload::new(serde_json::json!({"interview_id": "iv-1"})),
        );
        job.state = JobState::Running;
        job.started_at = started_at;
        job.attempts = attempts;
        job
    }

    #[test]
    fn test_recent_job_is_left_alone() {
        let mut job = running(Some(CUTOFF + 1), 0);
        assert_eq!(recover(&mut job, NOW, CUTOFF), Verdict::Live);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn test_stale_job_is_requeued_with_an_attempt_spent() {
        let mut job = running(Some(CUTOFF - 1), 0);
        job.schedule_at = Some(CUTOFF - 10);

        assert_eq!(recover(&mut job, NOW, CUTOFF), Verdict::Requeued);
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.attempts, 1);
        assert!(job.started_at.is_none());
        assert!(job.schedule_at.is_none());
        assert_eq!(job.last_error.as_deref(), Some(INTERRUPTED));
    }

    #[test]
    fn test_last_attempt_fails_the_job() {
        let mut job = running(Some(CUTOFF - 1), 2);
        assert_eq!(recover(&mut job, NOW, CUTOFF), Verdict::Exhausted);
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.finished_at, Some(NOW));
    }

    #[test]
    fn test_missing_start_time_fails_the_job() {
        let mut job = running(None, 0);
        assert_eq!(recover(&mut job, NOW, CUTOFF), Verdict::Corrupt);
        assert_eq!(job.state, JobState::Failed);
    }
}
