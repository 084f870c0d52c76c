//! Shared wiring for the integration tests
//!
//! Builds the full service graph over an in-memory SQLite database with a
//! fixed clock, sequential ids and a scripted Google calendar client.

#![allow(dead_code)]

use hireloop_api_rpc::RpcServices;
use hireloop_core::application::directory::CreateCandidateRequest;
use hireloop_core::application::directory::CreateUserRequest;
use hireloop_core::application::{
    AvailabilityReader, CalendarSyncService, DirectoryService, InterviewService, JobService,
    MaintenanceScheduler, ProviderRegistry, RateLimitConfig, RetryPolicy,
    SchedulingTaskExecutor, SlotService, TokenService, WeightedRateLimiter, Worker,
};
use hireloop_core::domain::{CalendarProvider, Job, UserRole, DAY_MS, HOUR_MS};
use hireloop_core::port::calendar_provider::mocks::MockCalendarProvider;
use hireloop_core::port::id_provider::mocks::SequentialIdProvider;
use hireloop_core::port::time_provider::mocks::FixedTimeProvider;
use hireloop_core::port::{JobRepository, MaintenanceConfig, Notifier, TaskExecutor};
use hireloop_infra_sqlite::{
    create_pool, run_migrations, SqliteAvailabilityRepository, SqliteConnectionRepository,
    SqliteCounterStore, SqliteDirectoryRepository, SqliteInterviewRepository,
    SqliteJobRepository, SqliteMaintenance,
};
use std::sync::Arc;

/// 2024-01-01T00:00:00Z, a Monday
pub const MONDAY: i64 = 1_704_067_200_000;

/// Retry delay used by test workers
pub const RETRY_BASE_MS: i64 = 1_000;

/// `day` days after MONDAY at `hour`:00 UTC
pub fn at(day: i64, hour: i64) -> i64 {
    MONDAY + day * DAY_MS + hour * HOUR_MS
}

pub struct Harness {
    pub clock: Arc<FixedTimeProvider>,
    pub google: Arc<MockCalendarProvider>,
    pub job_repo: Arc<SqliteJobRepository>,
    pub directory_repo: Arc<SqliteDirectoryRepository>,
    pub interview_repo: Arc<SqliteInterviewRepository>,
    pub connection_repo: Arc<SqliteConnectionRepository>,
    pub counters: Arc<SqliteCounterStore>,
    pub maintenance: Arc<SqliteMaintenance>,
    pub directory: Arc<DirectoryService>,
    pub slots: Arc<SlotService>,
    pub interviews: Arc<InterviewService>,
    pub tokens: Arc<TokenService>,
    pub sync: Arc<CalendarSyncService>,
}

/// Tenant with two interviewers and one candidate
pub struct Seed {
    pub tenant_id: String,
    pub alice: String,
    pub bob: String,
    pub candidate: String,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(FixedTimeProvider::new(MONDAY));
        let ids = Arc::new(SequentialIdProvider::new("it"));
        let google = Arc::new(MockCalendarProvider::new(CalendarProvider::Google));

        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), clock.clone()));
        let directory_repo = Arc::new(SqliteDirectoryRepository::new(pool.clone()));
        let availability_repo = Arc::new(SqliteAvailabilityRepository::new(pool.clone()));
        let interview_repo = Arc::new(SqliteInterviewRepository::new(pool.clone()));
        let connection_repo = Arc::new(SqliteConnectionRepository::new(pool.clone()));
        let counters = Arc::new(SqliteCounterStore::new(pool.clone(), clock.clone()));
        let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), clock.clone()));

        let reader = Arc::new(AvailabilityReader::new(
            availability_repo.clone(),
            interview_repo.clone(),
        ));
        let jobs = Arc::new(JobService::new(
            job_repo.clone(),
            job_repo.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let directory = Arc::new(DirectoryService::new(
            directory_repo.clone(),
            availability_repo.clone(),
            reader.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let slots = Arc::new(SlotService::new(
            directory_repo.clone(),
            reader.clone(),
            clock.clone(),
        ));
        let interviews = Arc::new(InterviewService::new(
            directory_repo.clone(),
            interview_repo.clone(),
            reader,
            jobs.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let tokens = Arc::new(TokenService::new(
            ProviderRegistry::new().register(google.clone()),
            directory_repo.clone(),
            connection_repo.clone(),
            availability_repo.clone(),
            jobs,
            ids.clone(),
            clock.clone(),
        ));
        let sync = Arc::new(CalendarSyncService::new(
            tokens.clone(),
            connection_repo.clone(),
            availability_repo,
            ids,
            clock.clone(),
            30,
        ));

        Self {
            clock,
            google,
            job_repo,
            directory_repo,
            interview_repo,
            connection_repo,
            counters,
            maintenance,
            directory,
            slots,
            interviews,
            tokens,
            sync,
        }
    }

    pub async fn seed(&self) -> Seed {
        let tenant = self.directory.create_tenant("Acme").await.unwrap();
        let alice = self.user(&tenant.id, "alice@acme.test", "Alice").await;
        let bob = self.user(&tenant.id, "bob@acme.test", "Bob").await;
        let candidate = self
            .directory
            .create_candidate(CreateCandidateRequest {
                tenant_id: tenant.id.clone(),
                name: "Casey Candidate".to_string(),
                email: "casey@example.test".to_string(),
            })
            .await
            .unwrap();

        Seed {
            tenant_id: tenant.id,
            alice,
            bob,
            candidate: candidate.id,
        }
    }

    async fn user(&self, tenant_id: &str, email: &str, name: &str) -> String {
        self.directory
            .create_user(CreateUserRequest {
                tenant_id: tenant_id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                role: UserRole::Interviewer,
                utc_offset_minutes: 0,
            })
            .await
            .unwrap()
            .id
    }

    pub fn executor(&self, notifier: Arc<dyn Notifier>) -> Arc<SchedulingTaskExecutor> {
        Arc::new(SchedulingTaskExecutor::new(
            self.directory_repo.clone(),
            self.interview_repo.clone(),
            notifier,
            self.sync.clone(),
            self.clock.clone(),
        ))
    }

    pub fn worker(&self, queue: &str, executor: Arc<dyn TaskExecutor>) -> Worker {
        Worker::new(
            queue.to_string(),
            self.job_repo.clone(),
            executor,
            Arc::new(RetryPolicy::new(self.clock.clone(), RETRY_BASE_MS)),
            self.clock.clone(),
        )
    }

    /// Every job ever enqueued under `subject_key`
    pub async fn jobs_for(&self, subject_key: &str) -> Vec<Job> {
        self.job_repo.find_by_subject(subject_key).await.unwrap()
    }

    pub fn rpc_services(&self, rate_limit: RateLimitConfig) -> RpcServices {
        RpcServices {
            directory: self.directory.clone(),
            slots: self.slots.clone(),
            interviews: self.interviews.clone(),
            sync: self.sync.clone(),
            job_repo: self.job_repo.clone(),
            maintenance: self.maintenance.clone(),
            maintenance_scheduler: Arc::new(MaintenanceScheduler::new(
                self.maintenance.clone(),
                MaintenanceConfig::default(),
                24,
            )),
            rate_limiter: WeightedRateLimiter::new(
                self.counters.clone(),
                self.clock.clone(),
                rate_limit,
            ),
        }
    }
}
