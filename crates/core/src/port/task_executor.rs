// Task executor port: notice delivery and calendar sync behind one call

use crate::domain::Job;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// Nothing to do any more (e.g. reminder for a cancelled interview)
    Skipped,
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Dependency failed: {0}")]
    Dependency(String),
}

/// Runs the work a dequeued job describes
///
/// An `Err` makes the worker retry the job with backoff until
/// `max_attempts` is spent. `Skipped` finishes it as DONE.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<ExecutionResult, ExecutionError>;
}

pub mod mocks {
    use super::*;
    use crate::domain::JobId;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum Outcome {
        Success,
        Fail(String),
        Panic(String),
    }

    /// Executor with one fixed outcome that records the jobs it was handed
    pub struct MockTaskExecutor {
        outcome: Outcome,
        executed: Mutex<Vec<JobId>>,
    }

    impl MockTaskExecutor {
        fn with(outcome: Outcome) -> Self {
            Self {
                outcome,
                executed: Mutex::new(Vec::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::with(Outcome::Success)
        }

        /// Every call fails as a delivery error
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::with(Outcome::Fail(message.into()))
        }

        /// Every call panics inside `execute`
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::with(Outcome::Panic(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.executed.lock().unwrap().len()
        }

        /// Job ids in call order
        pub fn executed(&self) -> Vec<JobId> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(&self, job: &Job) -> Result<ExecutionResult, ExecutionError> {
            self.executed.lock().unwrap().push(job.id.clone());

            match &self.outcome {
                Outcome::Success => Ok(ExecutionResult {
                    status: ExecutionStatus::Success,
                    duration_ms: 0,
                    detail: Some(format!("{} {}", job.job_type, job.subject_key)),
                }),
                Outcome::Fail(msg) => Err(ExecutionError::DeliveryFailed(msg.clone())),
                Outcome::Panic(msg) => panic!("{}", msg),
            }
        }
    }
}
