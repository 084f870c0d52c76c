//! RPC Method Handlers
//!
//! Each method throttles on the caller's tenant, delegates to the matching
//! use case and maps the result onto the wire types.

use crate::error::to_rpc_error;
use crate::rate_limiter::RateLimitGuard;
use crate::server::methods;
use crate::types::{
    AddBusyBlockRequest, AuthorizeRequest, ConnectionRequest, ConnectionResponse,
    CreateCandidateRequest, CreateTenantRequest, CreateUserRequest, InterviewRequest,
    ListBusyBlocksRequest, ListBusyBlocksResponse, ListUsersResponse, MaintenanceRequest,
    MaintenanceResponse, OAuthCallbackRequest, QueueDepth, RemoveBusyBlockRequest,
    RemoveBusyBlockResponse, RescheduleInterviewRequest, ScheduleInterviewRequest,
    SetRuleRequest, SetWorkingHoursRequest, StatsRequest, StatsResponse, SuggestSlotsRequest,
    SuggestSlotsResponse, TenantRequest, WorkingHoursResponse,
};
use hireloop_core::application::{
    AuthorizationStart, CalendarSyncService, DirectoryService, InterviewService,
    MaintenanceScheduler, SlotService, SyncOutcome, WeightedRateLimiter,
};
use hireloop_core::domain::{
    BusyBlock, Candidate, Interview, JobState, QueueConfig, SchedulingRule, Tenant, User,
};
use hireloop_core::port::{JobRepository, Maintenance};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// Everything the RPC surface calls into
pub struct RpcServices {
    pub directory: Arc<DirectoryService>,
    pub slots: Arc<SlotService>,
    pub interviews: Arc<InterviewService>,
    pub sync: Arc<CalendarSyncService>,
    pub job_repo: Arc<dyn JobRepository>,
    pub maintenance: Arc<dyn Maintenance>,
    pub maintenance_scheduler: Arc<MaintenanceScheduler>,
    pub rate_limiter: WeightedRateLimiter,
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    directory: Arc<DirectoryService>,
    slots: Arc<SlotService>,
    interviews: Arc<InterviewService>,
    sync: Arc<CalendarSyncService>,
    job_repo: Arc<dyn JobRepository>,
    maintenance: Arc<dyn Maintenance>,
    maintenance_scheduler: Arc<MaintenanceScheduler>,
    guard: RateLimitGuard,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(services: RpcServices) -> Self {
        Self {
            directory: services.directory,
            slots: services.slots,
            interviews: services.interviews,
            sync: services.sync,
            job_repo: services.job_repo,
            maintenance: services.maintenance,
            maintenance_scheduler: services.maintenance_scheduler,
            guard: RateLimitGuard::new(services.rate_limiter),
            start_time: Instant::now(),
        }
    }

    /// tenant.create.v1
    pub async fn create_tenant(&self, params: CreateTenantRequest) -> RpcResult<Tenant> {
        self.directory
            .create_tenant(&params.name)
            .await
            .map_err(to_rpc_error)
    }

    /// user.create.v1
    pub async fn create_user(&self, params: CreateUserRequest) -> RpcResult<User> {
        self.guard.admit(&params.tenant_id, methods::USER_CREATE).await?;
        self.directory.create_user(params).await.map_err(to_rpc_error)
    }

    /// user.list.v1
    pub async fn list_users(&self, params: TenantRequest) -> RpcResult<ListUsersResponse> {
        self.guard.admit(&params.tenant_id, methods::USER_LIST).await?;
        let users = self
            .directory
            .list_users(&params.tenant_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(ListUsersResponse { users })
    }

    /// candidate.create.v1
    pub async fn create_candidate(&self, params: CreateCandidateRequest) -> RpcResult<Candidate> {
        self.guard
            .admit(&params.tenant_id, methods::CANDIDATE_CREATE)
            .await?;
        self.directory
            .create_candidate(params)
            .await
            .map_err(to_rpc_error)
    }

    /// availability.working_hours.set.v1
    pub async fn set_working_hours(
        &self,
        params: SetWorkingHoursRequest,
    ) -> RpcResult<WorkingHoursResponse> {
        self.guard
            .admit(&params.tenant_id, methods::WORKING_HOURS_SET)
            .await?;

        // An empty list restores the defaults, so report what is now effective
        let directory = &self.directory;
        directory
            .set_working_hours(&params.tenant_id, &params.user_id, params.entries)
            .await
            .map_err(to_rpc_error)?;
        let working_hours = directory
            .working_hours(&params.tenant_id, &params.user_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(WorkingHoursResponse {
            user_id: params.user_id,
            working_hours,
        })
    }

    /// availability.busy.add.v1
    pub async fn add_busy_block(&self, params: AddBusyBlockRequest) -> RpcResult<BusyBlock> {
        self.guard.admit(&params.tenant_id, methods::BUSY_ADD).await?;
        self.directory
            .add_busy_block(params)
            .await
            .map_err(to_rpc_error)
    }

    /// availability.busy.remove.v1
    pub async fn remove_busy_block(
        &self,
        params: RemoveBusyBlockRequest,
    ) -> RpcResult<RemoveBusyBlockResponse> {
        self.guard.admit(&params.tenant_id, methods::BUSY_REMOVE).await?;
        self.directory
            .remove_busy_block(&params.tenant_id, &params.block_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(RemoveBusyBlockResponse {
            block_id: params.block_id,
            removed: true,
        })
    }

    /// availability.busy.list.v1
    pub async fn list_busy_blocks(
        &self,
        params: ListBusyBlocksRequest,
    ) -> RpcResult<ListBusyBlocksResponse> {
        self.guard.admit(&params.tenant_id, methods::BUSY_LIST).await?;
        let blocks = self
            .directory
            .list_busy_blocks(&params.tenant_id, &params.user_id, params.start, params.end)
            .await
            .map_err(to_rpc_error)?;
        Ok(ListBusyBlocksResponse { blocks })
    }

    /// rules.get.v1
    pub async fn get_rule(&self, params: TenantRequest) -> RpcResult<SchedulingRule> {
        self.guard.admit(&params.tenant_id, methods::RULES_GET).await?;
        self.directory
            .get_rule(&params.tenant_id)
            .await
            .map_err(to_rpc_error)
    }

    /// rules.set.v1
    pub async fn set_rule(&self, params: SetRuleRequest) -> RpcResult<SchedulingRule> {
        self.guard.admit(&params.tenant_id, methods::RULES_SET).await?;
        let current = self
            .directory
            .get_rule(&params.tenant_id)
            .await
            .map_err(to_rpc_error)?;
        self.directory
            .set_rule(params.apply_to(current))
            .await
            .map_err(to_rpc_error)
    }

    /// slots.suggest.v1
    pub async fn suggest_slots(
        &self,
        params: SuggestSlotsRequest,
    ) -> RpcResult<SuggestSlotsResponse> {
        self.guard
            .admit(&params.tenant_id, methods::SLOTS_SUGGEST)
            .await?;
        let slots = self.slots.suggest(params).await.map_err(to_rpc_error)?;
        Ok(SuggestSlotsResponse { slots })
    }

    /// interview.schedule.v1
    pub async fn schedule_interview(
        &self,
        params: ScheduleInterviewRequest,
    ) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_SCHEDULE)
            .await?;
        self.interviews
            .schedule(params)
            .await
            .map_err(to_rpc_error)
    }

    /// interview.reschedule.v1
    pub async fn reschedule_interview(
        &self,
        params: RescheduleInterviewRequest,
    ) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_RESCHEDULE)
            .await?;
        self.interviews
            .reschedule(
                &params.tenant_id,
                &params.interview_id,
                params.start,
                params.end,
            )
            .await
            .map_err(to_rpc_error)
    }

    /// interview.confirm.v1
    pub async fn confirm_interview(&self, params: InterviewRequest) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_CONFIRM)
            .await?;
        self.interviews
            .confirm(&params.tenant_id, &params.interview_id)
            .await
            .map_err(to_rpc_error)
    }

    /// interview.complete.v1
    pub async fn complete_interview(&self, params: InterviewRequest) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_COMPLETE)
            .await?;
        self.interviews
            .complete(&params.tenant_id, &params.interview_id)
            .await
            .map_err(to_rpc_error)
    }

    /// interview.cancel.v1
    pub async fn cancel_interview(&self, params: InterviewRequest) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_CANCEL)
            .await?;
        self.interviews
            .cancel(&params.tenant_id, &params.interview_id)
            .await
            .map_err(to_rpc_error)
    }

    /// interview.get.v1
    pub async fn get_interview(&self, params: InterviewRequest) -> RpcResult<Interview> {
        self.guard
            .admit(&params.tenant_id, methods::INTERVIEW_GET)
            .await?;
        self.interviews
            .get(&params.tenant_id, &params.interview_id)
            .await
            .map_err(to_rpc_error)
    }

    /// oauth.authorize.v1
    pub async fn authorize(&self, params: AuthorizeRequest) -> RpcResult<AuthorizationStart> {
        self.guard
            .admit(&params.tenant_id, methods::OAUTH_AUTHORIZE)
            .await?;
        self.sync
            .tokens()
            .begin_authorization(&params.tenant_id, &params.user_id, params.provider)
            .await
            .map_err(to_rpc_error)
    }

    /// oauth.callback.v1
    pub async fn oauth_callback(
        &self,
        params: OAuthCallbackRequest,
    ) -> RpcResult<ConnectionResponse> {
        let connection = self
            .sync
            .tokens()
            .complete_authorization(&params.state, &params.code)
            .await
            .map_err(to_rpc_error)?;
        Ok(connection.into())
    }

    /// calendar.disconnect.v1
    pub async fn disconnect_calendar(
        &self,
        params: ConnectionRequest,
    ) -> RpcResult<ConnectionResponse> {
        self.guard
            .admit(&params.tenant_id, methods::CALENDAR_DISCONNECT)
            .await?;
        let connection = self
            .sync
            .tokens()
            .disconnect(&params.tenant_id, &params.connection_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(connection.into())
    }

    /// calendar.sync.v1 - runs inline instead of waiting for the sync queue
    pub async fn sync_calendar(&self, params: ConnectionRequest) -> RpcResult<SyncOutcome> {
        self.guard
            .admit(&params.tenant_id, methods::CALENDAR_SYNC)
            .await?;
        self.sync
            .sync_connection(&params.tenant_id, &params.connection_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> RpcResult<StatsResponse> {
        let mut queues = Vec::new();
        for queue in QueueConfig::defaults() {
            let queued = self
                .job_repo
                .count_by_state(&queue.name, JobState::Queued)
                .await
                .map_err(to_rpc_error)?;
            let running = self
                .job_repo
                .count_by_state(&queue.name, JobState::Running)
                .await
                .map_err(to_rpc_error)?;
            queues.push(QueueDepth {
                queue: queue.name,
                queued,
                running,
            });
        }

        let stats = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(StatsResponse {
            queues,
            total_jobs: stats.job_count,
            finished_jobs: stats.finished_job_count,
            interviews: stats.interview_count,
            busy_blocks: stats.busy_block_count,
            db_size_bytes: stats.db_size_bytes,
            fragmentation_percent: stats.fragmentation_percent,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(&self, params: MaintenanceRequest) -> RpcResult<MaintenanceResponse> {
        info!(force_vacuum = params.force_vacuum, "Manual maintenance via RPC");

        let report = self
            .maintenance_scheduler
            .run_now(params.force_vacuum)
            .await
            .map_err(to_rpc_error)?;

        Ok(MaintenanceResponse::from(report))
    }
}
