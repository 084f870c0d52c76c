//! JSON-RPC Server
//!
//! Serves JSON-RPC 2.0 over HTTP. Binds to localhost unless configured otherwise.

use crate::handler::{RpcHandler, RpcServices};
use crate::types::{
    AddBusyBlockRequest, AuthorizeRequest, ConnectionRequest, CreateCandidateRequest,
    CreateTenantRequest, CreateUserRequest, InterviewRequest, ListBusyBlocksRequest,
    MaintenanceRequest, OAuthCallbackRequest, RemoveBusyBlockRequest, RescheduleInterviewRequest,
    ScheduleInterviewRequest, SetRuleRequest, SetWorkingHoursRequest, StatsRequest,
    SuggestSlotsRequest, TenantRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9610;

/// Versioned method names
pub mod methods {
    pub const TENANT_CREATE: &str = "tenant.create.v1";
    pub const USER_CREATE: &str = "user.create.v1";
    pub const USER_LIST: &str = "user.list.v1";
    pub const CANDIDATE_CREATE: &str = "candidate.create.v1";
    pub const WORKING_HOURS_SET: &str = "availability.working_hours.set.v1";
    pub const BUSY_ADD: &str = "availability.busy.add.v1";
    pub const BUSY_REMOVE: &str = "availability.busy.remove.v1";
    pub const BUSY_LIST: &str = "availability.busy.list.v1";
    pub const RULES_GET: &str = "rules.get.v1";
    pub const RULES_SET: &str = "rules.set.v1";
    pub const SLOTS_SUGGEST: &str = "slots.suggest.v1";
    pub const INTERVIEW_SCHEDULE: &str = "interview.schedule.v1";
    pub const INTERVIEW_RESCHEDULE: &str = "interview.reschedule.v1";
    pub const INTERVIEW_CONFIRM: &str = "interview.confirm.v1";
    pub const INTERVIEW_COMPLETE: &str = "interview.complete.v1";
    pub const INTERVIEW_CANCEL: &str = "interview.cancel.v1";
    pub const INTERVIEW_GET: &str = "interview.get.v1";
    pub const OAUTH_AUTHORIZE: &str = "oauth.authorize.v1";
    pub const OAUTH_CALLBACK: &str = "oauth.callback.v1";
    pub const CALENDAR_DISCONNECT: &str = "calendar.disconnect.v1";
    pub const CALENDAR_SYNC: &str = "calendar.sync.v1";
    pub const ADMIN_STATS: &str = "admin.stats.v1";
    pub const ADMIN_MAINTENANCE: &str = "admin.maintenance.v1";
}

/// RPC Server Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register one method: parse params into `$req`, call `handler.$call`
///
/// `optional` methods accept a call without params and use `$req::default()`.
macro_rules! register {
    ($module:expr, $handler:expr, $name:expr, optional $req:ty, $call:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: Option<$req> = params.parse()?;
                    handler.$call(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
    ($module:expr, $handler:expr, $name:expr, $req:ty, $call:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, services: RpcServices) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(services)),
        }
    }

    /// Build the module with every method registered
    pub fn module(&self) -> Result<RpcModule<()>, String> {
        use methods::*;

        let mut module = RpcModule::new(());
        let h = &self.handler;

        register!(module, h, TENANT_CREATE, CreateTenantRequest, create_tenant);
        register!(module, h, USER_CREATE, CreateUserRequest, create_user);
        register!(module, h, USER_LIST, TenantRequest, list_users);
        register!(module, h, CANDIDATE_CREATE, CreateCandidateRequest, create_candidate);

        register!(module, h, WORKING_HOURS_SET, SetWorkingHoursRequest, set_working_hours);
        register!(module, h, BUSY_ADD, AddBusyBlockRequest, add_busy_block);
        register!(module, h, BUSY_REMOVE, RemoveBusyBlockRequest, remove_busy_block);
        register!(module, h, BUSY_LIST, ListBusyBlocksRequest, list_busy_blocks);
        register!(module, h, RULES_GET, TenantRequest, get_rule);
        register!(module, h, RULES_SET, SetRuleRequest, set_rule);

        register!(module, h, SLOTS_SUGGEST, SuggestSlotsRequest, suggest_slots);

        register!(module, h, INTERVIEW_SCHEDULE, ScheduleInterviewRequest, schedule_interview);
        register!(module, h, INTERVIEW_RESCHEDULE, RescheduleInterviewRequest, reschedule_interview);
        register!(module, h, INTERVIEW_CONFIRM, InterviewRequest, confirm_interview);
        register!(module, h, INTERVIEW_COMPLETE, InterviewRequest, complete_interview);
        register!(module, h, INTERVIEW_CANCEL, InterviewRequest, cancel_interview);
        register!(module, h, INTERVIEW_GET, InterviewRequest, get_interview);

        register!(module, h, OAUTH_AUTHORIZE, AuthorizeRequest, authorize);
        register!(module, h, OAUTH_CALLBACK, OAuthCallbackRequest, oauth_callback);
        register!(module, h, CALENDAR_DISCONNECT, ConnectionRequest, disconnect_calendar);
        register!(module, h, CALENDAR_SYNC, ConnectionRequest, sync_calendar);

        // Admin APIs
        register!(module, h, ADMIN_STATS, optional StatsRequest, stats);
        register!(module, h, ADMIN_MAINTENANCE, optional MaintenanceRequest, maintenance);

        Ok(module)
    }

    /// Start the JSON-RPC server; returns the bound address (useful with port 0)
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        info!(addr = %local_addr, methods = module.method_names().count(), "JSON-RPC server started");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}
