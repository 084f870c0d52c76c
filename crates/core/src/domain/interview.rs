// Interview Domain Model

use crate::domain::directory::{CandidateId, TenantId, UserId};
use crate::domain::error::{DomainError, Result};
use crate::domain::time_range::TimeRange;
use serde::{Deserialize, Serialize};

pub type InterviewId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewState {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl InterviewState {
    /// Interviews in these states occupy their interviewers' calendars
    pub fn is_active(&self) -> bool {
        matches!(self, InterviewState::Scheduled | InterviewState::Confirmed)
    }
}

impl std::fmt::Display for InterviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterviewState::Scheduled => write!(f, "SCHEDULED"),
            InterviewState::Confirmed => write!(f, "CONFIRMED"),
            InterviewState::Cancelled => write!(f, "CANCELLED"),
            InterviewState::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for InterviewState {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(InterviewState::Scheduled),
            "CONFIRMED" => Ok(InterviewState::Confirmed),
            "CANCELLED" => Ok(InterviewState::Cancelled),
            "COMPLETED" => Ok(InterviewState::Completed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown interview state: {}",
                other
            ))),
        }
    }
}

/// Interview Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub tenant_id: TenantId,
    pub candidate_id: CandidateId,
    pub interviewer_ids: Vec<UserId>,
    pub range: TimeRange,
    pub title: String,
    pub state: InterviewState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Interview {
    /// Create a new interview in SCHEDULED state
    ///
    /// # Arguments
    ///
    /// * `id` - Unique interview ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        tenant_id: impl Into<String>,
        candidate_id: impl Into<String>,
        interviewer_ids: Vec<UserId>,
        range: TimeRange,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            candidate_id: candidate_id.into(),
            interviewer_ids,
            range,
            title: title.into(),
            state: InterviewState::Scheduled,
            created_at,
            updated_at: created_at,
        }
    }

    /// Subject key of the invitation jobs of this interview
    pub fn invitation_subject(&self) -> String {
        format!("interview:{}:invitation", self.id)
    }

    /// Subject key of the reminder jobs of this interview
    pub fn reminder_subject(&self) -> String {
        format!("interview:{}:reminder", self.id)
    }

    /// Subject key of the cancellation notice of this interview
    pub fn cancellation_subject(&self) -> String {
        format!("interview:{}:cancellation", self.id)
    }

    /// SCHEDULED -> CONFIRMED
    pub fn confirm(&mut self, now_millis: i64) -> Result<()> {
        if self.state != InterviewState::Scheduled {
            return Err(self.invalid_transition(InterviewState::Confirmed));
        }
        self.state = InterviewState::Confirmed;
        self.updated_at = now_millis;
        Ok(())
    }

    /// SCHEDULED | CONFIRMED -> CANCELLED
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        if !self.state.is_active() {
            return Err(self.invalid_transition(InterviewState::Cancelled));
        }
        self.state = InterviewState::Cancelled;
        self.updated_at = now_millis;
        Ok(())
    }

    /// SCHEDULED | CONFIRMED -> COMPLETED, only once the interview has ended
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        if !self.state.is_active() {
            return Err(self.invalid_transition(InterviewState::Completed));
        }
        if now_millis < self.range.end {
            return Err(DomainError::ValidationError(format!(
                "Interview {} has not ended yet",
                self.id
            )));
        }
        self.state = InterviewState::Completed;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Move to a new time; a confirmed interview needs confirming again
    pub fn reschedule(&mut self, range: TimeRange, now_millis: i64) -> Result<()> {
        if !self.state.is_active() {
            return Err(self.invalid_transition(InterviewState::Scheduled));
        }
        self.range = range;
        self.state = InterviewState::Scheduled;
        self.updated_at = now_millis;
        Ok(())
    }

    fn invalid_transition(&self, to: InterviewState) -> DomainError {
        DomainError::transition(self.state, to)
    }
}
