// Background Job Domain Model
// Invitations, reminders, cancellations and calendar syncs run through this queue

use crate::domain::directory::TenantId;
use crate::domain::error::{DomainError, Result as DomainResult};
use crate::domain::queue::{QueueId, NOTIFICATIONS_QUEUE, SYNC_QUEUE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job State
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Superseded,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Done | JobState::Failed | JobState::Superseded | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Superseded => write!(f, "SUPERSEDED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobState::Queued),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            "SUPERSEDED" => Ok(JobState::Superseded),
            "CANCELLED" => Ok(JobState::Cancelled),
            other => Err(DomainError::ValidationError(format!(
                "Unknown job state: {}",
                other
            ))),
        }
    }
}

/// Kinds of background work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    SendInvitation,
    SendReminder,
    SendCancellation,
    SyncCalendar,
}

impl JobType {
    /// Queue that carries this kind of job
    pub fn queue(&self) -> QueueId {
        match self {
            JobType::SyncCalendar => SYNC_QUEUE.to_string(),
            _ => NOTIFICATIONS_QUEUE.to_string(),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::SendInvitation => write!(f, "SEND_INVITATION"),
            JobType::SendReminder => write!(f, "SEND_REMINDER"),
            JobType::SendCancellation => write!(f, "SEND_CANCELLATION"),
            JobType::SyncCalendar => write!(f, "SYNC_CALENDAR"),
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND_INVITATION" => Ok(JobType::SendInvitation),
            "SEND_REMINDER" => Ok(JobType::SendReminder),
            "SEND_CANCELLATION" => Ok(JobType::SendCancellation),
            "SYNC_CALENDAR" => Ok(JobType::SyncCalendar),
            other => Err(DomainError::ValidationError(format!(
                "Unknown job type: {}",
                other
            ))),
        }
    }
}

/// Priority (higher number = higher priority)
pub type Priority = i32;

/// Subject Key (for supersede logic)
pub type SubjectKey = String;

/// Generation (for supersede logic)
pub type Generation = i64;

/// Job Payload (JSON serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Decode the payload into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.0.clone())
    }
}

/// Payload of invitation, reminder and cancellation jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewJobPayload {
    pub interview_id: String,
}

/// Payload of calendar sync jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobPayload {
    pub connection_id: String,
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    // Identity
    pub id: JobId,
    pub tenant_id: TenantId,
    pub queue: QueueId,
    pub job_type: JobType,
    pub subject_key: SubjectKey,
    pub generation: Generation,

    pub priority: Priority,
    pub state: JobState,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub payload: JobPayload,

    // Retry
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff_factor: f64,

    // Earliest run time (reminders, retry backoff)
    pub schedule_at: Option<i64>,
    pub last_error: Option<String>,
}

impl Job {
    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000.
    ///
    /// **Note**: This method should only be used in tests. For production code,
    /// always inject ID and time via providers.
    pub fn new_test(
        tenant_id: impl Into<String>,
        job_type: JobType,
        subject_key: impl Into<String>,
        generation: Generation,
        payload: JobPayload,
    ) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(
            id,
            created_at,
            tenant_id,
            job_type,
            subject_key,
            generation,
            payload,
        )
    }

    /// Create a new Job on the queue of its type
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `tenant_id` - Owning tenant
    /// * `job_type` - Job type
    /// * `subject_key` - Subject key for supersede logic
    /// * `generation` - Generation number
    /// * `payload` - Job payload
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        tenant_id: impl Into<String>,
        job_type: JobType,
        subject_key: impl Into<String>,
        generation: Generation,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            queue: job_type.queue(),
            job_type,
            subject_key: subject_key.into(),
            generation,
            priority: 0,
            state: JobState::Queued,
            created_at,
            started_at: None,
            finished_at: None,
            payload,
            attempts: 0,
            max_attempts: 3,
            backoff_factor: 2.0,
            schedule_at: None,
            last_error: None,
        }
    }

    /// Transition to Running state with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> DomainResult<()> {
        if self.state != JobState::Queued {
            return Err(DomainError::transition(&self.state, JobState::Running));
        }
        self.state = JobState::Running;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Done state with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> DomainResult<()> {
        if self.state != JobState::Running {
            return Err(DomainError::transition(&self.state, JobState::Done));
        }
        self.state = JobState::Done;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Mark as Superseded with explicit timestamp
    pub fn supersede(&mut self, now_millis: i64) {
        self.state = JobState::Superseded;
        self.finished_at = Some(now_millis);
    }

    /// Mark as Failed with explicit timestamp
    pub fn fail(&mut self, now_millis: i64, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.finished_at = Some(now_millis);
        self.last_error = Some(error.into());
    }
}
