//! Hireloop scheduling engine - daemon entry point

mod config;
mod logging;

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use hireloop_api_rpc::{RpcServer, RpcServices};
use hireloop_core::application::worker::constants::GRACEFUL_SHUTDOWN_TIMEOUT_MS;
use hireloop_core::application::{
    shutdown_channel, AvailabilityReader, CalendarSyncScheduler, CalendarSyncService,
    DirectoryService, InterviewService, JobService, MaintenanceScheduler, ProviderRegistry,
    RateLimitConfig, RecoveryService, RetryPolicy, SchedulingTaskExecutor, SlotService,
    TokenService, WeightedRateLimiter, Worker,
};
use hireloop_core::domain::QueueConfig;
use hireloop_core::port::id_provider::UuidProvider;
use hireloop_core::port::time_provider::SystemTimeProvider;
use hireloop_core::port::{IdProvider, MaintenanceConfig, Notifier, TimeProvider};
use hireloop_infra_http::{
    http_client, GoogleCalendarClient, LogNotifier, MicrosoftCalendarClient, WebhookNotifier,
};
use hireloop_infra_sqlite::{
    create_pool, run_migrations, SqliteAvailabilityRepository, SqliteConnectionRepository,
    SqliteCounterStore, SqliteDirectoryRepository, SqliteInterviewRepository,
    SqliteJobRepository, SqliteMaintenance,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_millis(GRACEFUL_SHUTDOWN_TIMEOUT_MS as u64);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let cfg = DaemonConfig::load()?;
    let _log_guard = logging::init(&cfg.log)?;

    info!("Hireloop v{} starting...", VERSION);

    // 2. Database
    if let Some(parent) = cfg.database_path().and_then(|p| p.parent()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }
    info!(database_url = %cfg.database.url, "Initializing database...");

    let pool = create_pool(&cfg.database.url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Adapters
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

    let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone()));
    let directory = Arc::new(SqliteDirectoryRepository::new(pool.clone()));
    let availability = Arc::new(SqliteAvailabilityRepository::new(pool.clone()));
    let interviews = Arc::new(SqliteInterviewRepository::new(pool.clone()));
    let connections = Arc::new(SqliteConnectionRepository::new(pool.clone()));
    let counters = Arc::new(SqliteCounterStore::new(pool.clone(), time_provider.clone()));
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time_provider.clone()));

    let http = http_client().context("Failed to build HTTP client")?;

    let mut providers = ProviderRegistry::new();
    if cfg.oauth.google.is_configured() {
        providers = providers.register(Arc::new(GoogleCalendarClient::new(
            http.clone(),
            cfg.oauth.google.clone(),
        )));
        info!("Google calendar provider enabled");
    } else {
        warn!("Google OAuth client not configured, provider disabled");
    }
    if cfg.oauth.microsoft.is_configured() {
        providers = providers.register(Arc::new(MicrosoftCalendarClient::new(
            http.clone(),
            cfg.oauth.microsoft.clone(),
        )));
        info!("Microsoft calendar provider enabled");
    } else {
        warn!("Microsoft OAuth client not configured, provider disabled");
    }

    let notifier: Arc<dyn Notifier> = match &cfg.notifier.webhook_url {
        Some(url) => {
            info!(webhook_url = %url, "Webhook notifier enabled");
            Arc::new(WebhookNotifier::new(http.clone(), url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    // 4. Crash recovery
    info!("Running crash recovery...");
    let recovery_service = RecoveryService::new(job_repo.clone(), time_provider.clone(), None);
    match recovery_service.recover_orphaned_jobs().await {
        Ok(count) => info!(recovered_jobs = count, "Crash recovery completed"),
        Err(e) => error!(error = ?e, "Crash recovery failed"),
    }

    // 5. Use cases
    let reader = Arc::new(AvailabilityReader::new(
        availability.clone(),
        interviews.clone(),
    ));
    let jobs = Arc::new(JobService::new(
        job_repo.clone(),
        job_repo.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let directory_service = Arc::new(DirectoryService::new(
        directory.clone(),
        availability.clone(),
        reader.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let slot_service = Arc::new(SlotService::new(
        directory.clone(),
        reader.clone(),
        time_provider.clone(),
    ));
    let interview_service = Arc::new(InterviewService::new(
        directory.clone(),
        interviews.clone(),
        reader,
        jobs.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let tokens = Arc::new(TokenService::new(
        providers,
        directory.clone(),
        connections.clone(),
        availability.clone(),
        jobs,
        id_provider.clone(),
        time_provider.clone(),
    ));
    let sync = Arc::new(CalendarSyncService::new(
        tokens.clone(),
        connections.clone(),
        availability,
        id_provider,
        time_provider.clone(),
        cfg.sync.horizon_days,
    ));
    let executor = Arc::new(SchedulingTaskExecutor::new(
        directory,
        interviews,
        notifier,
        sync.clone(),
        time_provider.clone(),
    ));
    let retry_policy = Arc::new(RetryPolicy::new(
        time_provider.clone(),
        cfg.worker.retry_base_delay_ms,
    ));
    let maintenance_config = MaintenanceConfig::from(&cfg.maintenance);

    // 6. JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rate_limiter = WeightedRateLimiter::new(
        counters,
        time_provider.clone(),
        RateLimitConfig::from(&cfg.rate_limit),
    );
    let rpc_server = RpcServer::new(
        cfg.rpc.clone(),
        RpcServices {
            directory: directory_service,
            slots: slot_service,
            interviews: interview_service,
            sync,
            job_repo: job_repo.clone(),
            maintenance: maintenance.clone(),
            maintenance_scheduler: Arc::new(MaintenanceScheduler::new(
                maintenance.clone(),
                maintenance_config.clone(),
                cfg.maintenance.interval_hours,
            )),
            rate_limiter,
        },
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow!("RPC server start failed: {}", e))?;

    // 7. Workers, one set per queue
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut worker_handles = Vec::new();

    for queue in QueueConfig::defaults() {
        info!(queue = %queue.name, workers = queue.max_workers, "Starting workers...");
        for _ in 0..queue.max_workers {
            let worker = Worker::new(
                queue.name.clone(),
                job_repo.clone(),
                executor.clone(),
                retry_policy.clone(),
                time_provider.clone(),
            );
            let token = shutdown_rx.clone();
            let queue_name = queue.name.clone();
            worker_handles.push(tokio::spawn(async move {
                if let Err(e) = worker.run(token).await {
                    error!(queue = %queue_name, error = ?e, "Worker failed");
                }
            }));
        }
    }

    // 8. Background schedulers
    let sync_scheduler =
        CalendarSyncScheduler::new(tokens, connections, cfg.sync.interval_minutes);
    tokio::spawn(sync_scheduler.run(shutdown_rx.clone()));

    let maintenance_scheduler = MaintenanceScheduler::new(
        maintenance,
        maintenance_config,
        cfg.maintenance.interval_hours,
    );
    tokio::spawn(maintenance_scheduler.run(shutdown_rx));

    info!(rpc_addr = %rpc_addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 9. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 10. Graceful shutdown: workers finish their current job
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow!("RPC server stop failed: {}", e))?;

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        for handle in worker_handles {
            let _ = handle.await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Workers still busy after grace period");
    }

    info!("Shutdown complete.");

    Ok(())
}
