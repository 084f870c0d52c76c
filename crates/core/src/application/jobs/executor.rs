// Task executor for the scheduling domain
// Notification jobs go to the Notifier port, sync jobs to the calendar sync service

use crate::application::calendar::{CalendarSyncService, SyncOutcome};
use crate::domain::{
    InterviewJobPayload, InterviewState, Job, JobType, SyncJobPayload,
};
use crate::error::AppError;
use crate::port::{
    DirectoryRepository, ExecutionError, ExecutionResult, ExecutionStatus, InterviewRepository,
    Notification, NotificationKind, Notifier, Recipient, TaskExecutor, TimeProvider,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct SchedulingTaskExecutor {
    directory: Arc<dyn DirectoryRepository>,
    interviews: Arc<dyn InterviewRepository>,
    notifier: Arc<dyn Notifier>,
    sync: Arc<CalendarSyncService>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SchedulingTaskExecutor {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        interviews: Arc<dyn InterviewRepository>,
        notifier: Arc<dyn Notifier>,
        sync: Arc<CalendarSyncService>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            directory,
            interviews,
            notifier,
            sync,
            time_provider,
        }
    }

    async fn send_notice(
        &self,
        job: &Job,
        kind: NotificationKind,
    ) -> Result<(ExecutionStatus, Option<String>), ExecutionError> {
        let payload: InterviewJobPayload = job
            .payload
            .parse()
            .map_err(|e| ExecutionError::InvalidPayload(e.to_string()))?;

        let Some(interview) = self
            .interviews
            .find_by_id(&job.tenant_id, &payload.interview_id)
            .await
            .map_err(dependency)?
        else {
            return Ok(skipped("interview no longer exists"));
        };

        let relevant = match kind {
            NotificationKind::Cancellation => interview.state == InterviewState::Cancelled,
            NotificationKind::Invitation | NotificationKind::Reminder => interview.state.is_active(),
        };
        if !relevant {
            return Ok(skipped(&format!("interview is {}", interview.state)));
        }

        let candidate = self
            .directory
            .find_candidate(&job.tenant_id, &interview.candidate_id)
            .await
            .map_err(dependency)?
            .ok_or_else(|| {
                ExecutionError::Dependency(format!("candidate {} not found", interview.candidate_id))
            })?;

        let mut interviewers = Vec::with_capacity(interview.interviewer_ids.len());
        for user_id in &interview.interviewer_ids {
            if let Some(user) = self
                .directory
                .find_user(&job.tenant_id, user_id)
                .await
                .map_err(dependency)?
            {
                interviewers.push(Recipient {
                    name: user.name,
                    email: user.email,
                });
            }
        }

        let notification = Notification {
            kind,
            tenant_id: interview.tenant_id.clone(),
            interview_id: interview.id.clone(),
            title: interview.title.clone(),
            range: interview.range,
            candidate: Recipient {
                name: candidate.name,
                email: candidate.email,
            },
            interviewers,
        };

        self.notifier
            .notify(&notification)
            .await
            .map_err(|e| ExecutionError::DeliveryFailed(e.to_string()))?;

        info!(
            job_id = %job.id,
            interview_id = %interview.id,
            kind = ?kind,
            "Notification delivered"
        );
        Ok((ExecutionStatus::Success, None))
    }

    async fn run_sync(&self, job: &Job) -> Result<(ExecutionStatus, Option<String>), ExecutionError> {
        let payload: SyncJobPayload = job
            .payload
            .parse()
            .map_err(|e| ExecutionError::InvalidPayload(e.to_string()))?;

        match self
            .sync
            .sync_connection(&job.tenant_id, &payload.connection_id)
            .await
        {
            Ok(SyncOutcome::Synced { blocks, removed }) => Ok((
                ExecutionStatus::Success,
                Some(format!("{} blocks synced, {} replaced", blocks, removed)),
            )),
            Ok(SyncOutcome::Skipped { reason }) => Ok(skipped(&reason)),
            Ok(SyncOutcome::Failed { reason }) => Err(ExecutionError::SyncFailed(reason)),
            Err(AppError::NotFound(msg)) => Ok(skipped(&msg)),
            Err(e) => Err(dependency(e)),
        }
    }
}

fn skipped(reason: &str) -> (ExecutionStatus, Option<String>) {
    (ExecutionStatus::Skipped, Some(reason.to_string()))
}

fn dependency(e: AppError) -> ExecutionError {
    ExecutionError::Dependency(e.to_string())
}

#[async_trait]
impl TaskExecutor for SchedulingTaskExecutor {
    async fn execute(&self, job: &Job) -> Result<ExecutionResult, ExecutionError> {
        let started = self.time_provider.now_millis();

        let (status, detail) = match job.job_type {
            JobType::SendInvitation => self.send_notice(job, NotificationKind::Invitation).await?,
            JobType::SendReminder => self.send_notice(job, NotificationKind::Reminder).await?,
            JobType::SendCancellation => {
                self.send_notice(job, NotificationKind::Cancellation).await?
            }
            JobType::SyncCalendar => self.run_sync(job).await?,
        };

        if status == ExecutionStatus::Skipped {
            info!(job_id = %job.id, reason = ?detail, "Job skipped");
        }

        Ok(ExecutionResult {
            status,
            duration_ms: self.time_provider.now_millis() - started,
            detail,
        })
    }
}
