// OAuth token lifecycle for external calendars

use crate::application::jobs::{EnqueueRequest, JobService};
use crate::domain::{
    CalendarConnection, CalendarProvider, ConnectionStatus, JobType, OAuthState, SyncJobPayload,
    MINUTE_MS,
};
use crate::error::{AppError, Result};
use crate::port::{
    AvailabilityRepository, CalendarProviderClient, ConnectionRepository, DirectoryRepository,
    IdProvider, ProviderError, TimeProvider,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifetime of a pending authorization
pub const STATE_TTL_MS: i64 = 10 * MINUTE_MS;

/// Tokens expiring sooner than this are refreshed before use
pub const REFRESH_SKEW_MS: i64 = 5 * MINUTE_MS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStart {
    pub authorization_url: String,
    pub state: String,
}

/// Configured provider clients keyed by provider
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    clients: HashMap<CalendarProvider, Arc<dyn CalendarProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, client: Arc<dyn CalendarProviderClient>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }

    pub fn get(&self, provider: CalendarProvider) -> Result<Arc<dyn CalendarProviderClient>> {
        self.clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| ProviderError::NotConfigured(provider.to_string()).into())
    }
}

pub struct TokenService {
    providers: ProviderRegistry,
    directory: Arc<dyn DirectoryRepository>,
    connections: Arc<dyn ConnectionRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    jobs: Arc<JobService>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TokenService {
    pub fn new(
        providers: ProviderRegistry,
        directory: Arc<dyn DirectoryRepository>,
        connections: Arc<dyn ConnectionRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        jobs: Arc<JobService>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            providers,
            directory,
            connections,
            availability,
            jobs,
            id_provider,
            time_provider,
        }
    }

    pub fn client(&self, provider: CalendarProvider) -> Result<Arc<dyn CalendarProviderClient>> {
        self.providers.get(provider)
    }

    /// Store a single-use state and build the provider consent URL
    pub async fn begin_authorization(
        &self,
        tenant_id: &str,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<AuthorizationStart> {
        self.directory
            .find_user(tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        let client = self.client(provider)?;
        let state = self.id_provider.generate_id();
        let authorization_url = client.authorization_url(&state)?;

        self.connections
            .save_state(&OAuthState {
                state: state.clone(),
                tenant_id: tenant_id.to_string(),
                user_id: user_id.to_string(),
                provider,
                expires_at: self.time_provider.now_millis() + STATE_TTL_MS,
            })
            .await?;

        info!(tenant_id = %tenant_id, user_id = %user_id, provider = %provider, "Authorization started");

        Ok(AuthorizationStart {
            authorization_url,
            state,
        })
    }

    /// Consume the state, exchange the code, activate the connection and queue a first sync
    pub async fn complete_authorization(
        &self,
        state: &str,
        code: &str,
    ) -> Result<CalendarConnection> {
        let pending = self
            .connections
            .take_state(state)
            .await?
            .ok_or_else(|| AppError::NotFound("Unknown or already used OAuth state".to_string()))?;

        let now = self.time_provider.now_millis();
        if pending.expires_at <= now {
            return Err(AppError::Validation("OAuth state has expired".to_string()));
        }

        let client = self.client(pending.provider)?;
        let tokens = client.exchange_code(code).await?;

        let mut connection = match self
            .connections
            .find_for_user(&pending.tenant_id, &pending.user_id, pending.provider)
            .await?
        {
            Some(existing) => existing,
            None => CalendarConnection {
                id: self.id_provider.generate_id(),
                tenant_id: pending.tenant_id.clone(),
                user_id: pending.user_id.clone(),
                provider: pending.provider,
                access_token: None,
                refresh_token: None,
                expires_at: None,
                status: ConnectionStatus::Active,
                last_synced_at: None,
                created_at: now,
                updated_at: now,
            },
        };
        connection.apply_tokens(tokens, now);

        let connection = self.connections.upsert(&connection).await?;

        info!(
            tenant_id = %connection.tenant_id,
            connection_id = %connection.id,
            provider = %connection.provider,
            "Calendar connected"
        );

        self.enqueue_sync(&connection).await?;
        Ok(connection)
    }

    /// Usable access token, refreshing when it is about to expire
    ///
    /// `None` means the calendar cannot be read right now; permanent
    /// failures are recorded on the connection.
    pub async fn access_token(&self, connection: &mut CalendarConnection) -> Result<Option<String>> {
        let now = self.time_provider.now_millis();

        if connection.has_fresh_token(now, REFRESH_SKEW_MS) {
            return Ok(connection.access_token.clone());
        }
        if connection.status != ConnectionStatus::Active {
            return Ok(None);
        }

        let Some(refresh_token) = connection.refresh_token.clone() else {
            warn!(connection_id = %connection.id, "Access token expired without refresh token");
            connection.status = ConnectionStatus::Expired;
            connection.updated_at = now;
            self.connections.update(connection).await?;
            return Ok(None);
        };

        let client = self.client(connection.provider)?;
        match client.refresh(&refresh_token).await {
            Ok(tokens) => {
                connection.apply_tokens(tokens, now);
                self.connections.update(connection).await?;
                info!(connection_id = %connection.id, "Access token refreshed");
                Ok(connection.access_token.clone())
            }
            Err(e) if e.is_permanent() => {
                warn!(connection_id = %connection.id, error = %e, "Refresh token revoked");
                connection.status = ConnectionStatus::Revoked;
                connection.updated_at = now;
                self.connections.update(connection).await?;
                Ok(None)
            }
            Err(e) => {
                warn!(connection_id = %connection.id, error = %e, "Token refresh failed, will retry later");
                Ok(None)
            }
        }
    }

    /// Drop tokens, synced busy blocks and pending syncs of a connection
    pub async fn disconnect(
        &self,
        tenant_id: &str,
        connection_id: &str,
    ) -> Result<CalendarConnection> {
        let mut connection = self
            .connections
            .find_by_id(tenant_id, connection_id)
            .await?
            .ok_or_else(|| AppError::not_found("Calendar connection", connection_id))?;

        connection.disconnect(self.time_provider.now_millis());
        self.connections.update(&connection).await?;

        let removed = self
            .availability
            .delete_blocks_by_source(
                tenant_id,
                &connection.user_id,
                connection.provider.busy_source(),
            )
            .await?;
        self.jobs.cancel_subject(&connection.sync_subject()).await?;

        info!(
            tenant_id = %tenant_id,
            connection_id = %connection.id,
            removed_blocks = removed,
            "Calendar disconnected"
        );
        Ok(connection)
    }

    pub async fn enqueue_sync(&self, connection: &CalendarConnection) -> Result<()> {
        let payload = serde_json::to_value(SyncJobPayload {
            connection_id: connection.id.clone(),
        })?;
        self.jobs
            .enqueue(EnqueueRequest {
                tenant_id: connection.tenant_id.clone(),
                job_type: JobType::SyncCalendar,
                subject_key: connection.sync_subject(),
                payload,
                priority: 0,
                schedule_at: None,
            })
            .await?;
        Ok(())
    }
}
