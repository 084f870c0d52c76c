// Interview scheduling use cases

use crate::application::availability::AvailabilityReader;
use crate::application::jobs::{EnqueueRequest, JobService};
use crate::application::keyed_lock::KeyedLock;
use crate::domain::{
    Interview, InterviewJobPayload, JobType, SchedulingRule, TimeRange, UserId,
};
use crate::error::{AppError, Result};
use crate::port::{DirectoryRepository, IdProvider, InterviewRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Invitations go out ahead of reminders
const INVITATION_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInterviewRequest {
    pub tenant_id: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<UserId>,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub title: Option<String>,
}

pub struct InterviewService {
    directory: Arc<dyn DirectoryRepository>,
    interviews: Arc<dyn InterviewRepository>,
    reader: Arc<AvailabilityReader>,
    jobs: Arc<JobService>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    /// Per tenant; held from the conflict check until the write lands
    bookings: KeyedLock,
}

impl InterviewService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        interviews: Arc<dyn InterviewRepository>,
        reader: Arc<AvailabilityReader>,
        jobs: Arc<JobService>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            directory,
            interviews,
            reader,
            jobs,
            id_provider,
            time_provider,
            bookings: KeyedLock::new(),
        }
    }

    pub async fn schedule(&self, req: ScheduleInterviewRequest) -> Result<Interview> {
        if req.interviewer_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one interviewer is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = req.interviewer_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(AppError::Validation(format!(
                "Interviewer {} is listed more than once",
                dup
            )));
        }
        let range = TimeRange::new(req.start, req.end)?;

        let candidate = self
            .directory
            .find_candidate(&req.tenant_id, &req.candidate_id)
            .await?
            .ok_or_else(|| AppError::not_found("Candidate", &req.candidate_id))?;
        for user_id in &req.interviewer_ids {
            self.directory
                .find_user(&req.tenant_id, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("User", user_id))?;
        }

        let rule = self.reader.rule(&req.tenant_id).await?;
        let booking = self.bookings.lock(&req.tenant_id).await;
        let now = self.time_provider.now_millis();
        self.check_bookable(&req.tenant_id, &req.interviewer_ids, range, &rule, now, None)
            .await?;

        let title = req
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Interview with {}", candidate.name));

        let interview = Interview::new(
            self.id_provider.generate_id(),
            now,
            req.tenant_id,
            candidate.id,
            req.interviewer_ids,
            range,
            title,
        );
        self.interviews.insert(&interview).await?;
        drop(booking);

        info!(
            tenant_id = %interview.tenant_id,
            interview_id = %interview.id,
            start = interview.range.start,
            "Interview scheduled"
        );

        self.enqueue_notices(&interview, &rule, now).await?;
        Ok(interview)
    }

    pub async fn reschedule(
        &self,
        tenant_id: &str,
        interview_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Interview> {
        let booking = self.bookings.lock(tenant_id).await;
        let mut interview = self.get(tenant_id, interview_id).await?;
        if !interview.state.is_active() {
            return Err(AppError::InvalidState(format!(
                "Interview {} is {} and cannot be rescheduled",
                interview.id, interview.state
            )));
        }
        let range = TimeRange::new(start, end)?;

        let rule = self.reader.rule(tenant_id).await?;
        let now = self.time_provider.now_millis();
        self.check_bookable(
            tenant_id,
            &interview.interviewer_ids,
            range,
            &rule,
            now,
            Some(&interview.id),
        )
        .await?;

        interview.reschedule(range, now)?;
        self.interviews.update(&interview).await?;
        drop(booking);

        info!(
            tenant_id = %tenant_id,
            interview_id = %interview.id,
            start = interview.range.start,
            "Interview rescheduled"
        );

        // Same subject keys: queued notices of the old time are superseded
        self.enqueue_notices(&interview, &rule, now).await?;
        Ok(interview)
    }

    pub async fn confirm(&self, tenant_id: &str, interview_id: &str) -> Result<Interview> {
        let mut interview = self.get(tenant_id, interview_id).await?;
        interview.confirm(self.time_provider.now_millis())?;
        self.interviews.update(&interview).await?;
        info!(tenant_id = %tenant_id, interview_id = %interview.id, "Interview confirmed");
        Ok(interview)
    }

    pub async fn complete(&self, tenant_id: &str, interview_id: &str) -> Result<Interview> {
        let mut interview = self.get(tenant_id, interview_id).await?;
        interview.complete(self.time_provider.now_millis())?;
        self.interviews.update(&interview).await?;
        info!(tenant_id = %tenant_id, interview_id = %interview.id, "Interview completed");
        Ok(interview)
    }

    pub async fn cancel(&self, tenant_id: &str, interview_id: &str) -> Result<Interview> {
        let mut interview = self.get(tenant_id, interview_id).await?;
        let now = self.time_provider.now_millis();
        interview.cancel(now)?;
        self.interviews.update(&interview).await?;

        self.jobs
            .cancel_subject(&interview.invitation_subject())
            .await?;
        self.jobs.cancel_subject(&interview.reminder_subject()).await?;
        self.enqueue_notice(
            &interview,
            JobType::SendCancellation,
            interview.cancellation_subject(),
            INVITATION_PRIORITY,
            None,
        )
        .await?;

        info!(tenant_id = %tenant_id, interview_id = %interview.id, "Interview cancelled");
        Ok(interview)
    }

    pub async fn get(&self, tenant_id: &str, interview_id: &str) -> Result<Interview> {
        self.interviews
            .find_by_id(tenant_id, interview_id)
            .await?
            .ok_or_else(|| AppError::not_found("Interview", interview_id))
    }

    async fn check_bookable(
        &self,
        tenant_id: &str,
        interviewer_ids: &[UserId],
        range: TimeRange,
        rule: &SchedulingRule,
        now: i64,
        exclude_interview: Option<&str>,
    ) -> Result<()> {
        if range.start < now.saturating_add(rule.min_notice_ms()) {
            return Err(AppError::Validation(format!(
                "Interviews need at least {} minutes notice",
                rule.min_notice_minutes
            )));
        }

        for user_id in interviewer_ids {
            if self
                .reader
                .has_conflict(tenant_id, user_id, range, rule, exclude_interview)
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "Interviewer {} is not available for {}",
                    user_id, range
                )));
            }
        }
        Ok(())
    }

    async fn enqueue_notices(&self, interview: &Interview, rule: &SchedulingRule, now: i64) -> Result<()> {
        self.enqueue_notice(
            interview,
            JobType::SendInvitation,
            interview.invitation_subject(),
            INVITATION_PRIORITY,
            None,
        )
        .await?;

        let remind_at = interview.range.start - rule.reminder_lead_ms();
        if remind_at > now {
            self.enqueue_notice(
                interview,
                JobType::SendReminder,
                interview.reminder_subject(),
                0,
                Some(remind_at),
            )
            .await?;
        } else {
            // Too close for a reminder; drop one queued for an earlier time
            self.jobs.cancel_subject(&interview.reminder_subject()).await?;
        }
        Ok(())
    }

    async fn enqueue_notice(
        &self,
        interview: &Interview,
        job_type: JobType,
        subject_key: String,
        priority: i32,
        schedule_at: Option<i64>,
    ) -> Result<()> {
        let payload = serde_json::to_value(InterviewJobPayload {
            interview_id: interview.id.clone(),
        })?;
        self.jobs
            .enqueue(EnqueueRequest {
                tenant_id: interview.tenant_id.clone(),
                job_type,
                subject_key,
                payload,
                priority,
                schedule_at,
            })
            .await?;
        Ok(())
    }
}
