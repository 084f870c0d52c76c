// Calendar sync: pull busy time from connected providers into busy blocks

use super::oauth::TokenService;
use crate::application::worker::ShutdownToken;
use crate::domain::{BusyBlock, ConnectionStatus, TimeRange, DAY_MS};
use crate::error::{AppError, Result};
use crate::port::{AvailabilityRepository, ConnectionRepository, IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

pub const DEFAULT_SYNC_HORIZON_DAYS: i64 = 30;
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOutcome {
    Synced { blocks: usize, removed: u64 },
    /// No usable token (expired, revoked, disconnected, refresh pending)
    Skipped { reason: String },
    /// Provider call failed; previous busy blocks are kept
    Failed { reason: String },
}

pub struct CalendarSyncService {
    tokens: Arc<TokenService>,
    connections: Arc<dyn ConnectionRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    horizon_days: i64,
}

impl CalendarSyncService {
    pub fn new(
        tokens: Arc<TokenService>,
        connections: Arc<dyn ConnectionRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        horizon_days: i64,
    ) -> Self {
        Self {
            tokens,
            connections,
            availability,
            id_provider,
            time_provider,
            horizon_days,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub async fn sync_connection(&self, tenant_id: &str, connection_id: &str) -> Result<SyncOutcome> {
        let mut connection = self
            .connections
            .find_by_id(tenant_id, connection_id)
            .await?
            .ok_or_else(|| AppError::not_found("Calendar connection", connection_id))?;

        if connection.status != ConnectionStatus::Active {
            return Ok(SyncOutcome::Skipped {
                reason: format!("connection is {}", connection.status),
            });
        }

        let Some(access_token) = self.tokens.access_token(&mut connection).await? else {
            info!(connection_id = %connection.id, "Sync skipped, no usable access token");
            return Ok(SyncOutcome::Skipped {
                reason: "no usable access token".to_string(),
            });
        };

        let now = self.time_provider.now_millis();
        let horizon = TimeRange::from_bounds(now, now + self.horizon_days * DAY_MS);
        let client = self.tokens.client(connection.provider)?;

        let busy = match client.fetch_busy(&access_token, horizon).await {
            Ok(busy) => busy,
            Err(e) => {
                warn!(connection_id = %connection.id, error = %e, "Calendar fetch failed");
                return Ok(SyncOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        let source = connection.provider.busy_source();
        let blocks: Vec<BusyBlock> = busy
            .into_iter()
            .filter_map(|b| {
                b.range.intersection(&horizon).map(|range| BusyBlock {
                    id: self.id_provider.generate_id(),
                    tenant_id: connection.tenant_id.clone(),
                    user_id: connection.user_id.clone(),
                    range,
                    source,
                    external_id: b.external_id,
                    title: b.title,
                    created_at: now,
                })
            })
            .collect();

        let removed = self
            .availability
            .replace_external_blocks(
                &connection.tenant_id,
                &connection.user_id,
                source,
                horizon,
                &blocks,
            )
            .await?;

        connection.last_synced_at = Some(now);
        connection.updated_at = now;
        self.connections.update(&connection).await?;

        info!(
            tenant_id = %connection.tenant_id,
            connection_id = %connection.id,
            blocks = blocks.len(),
            removed,
            "Calendar synced"
        );

        Ok(SyncOutcome::Synced {
            blocks: blocks.len(),
            removed,
        })
    }
}

/// Periodically queues a sync job for every active connection
pub struct CalendarSyncScheduler {
    tokens: Arc<TokenService>,
    connections: Arc<dyn ConnectionRepository>,
    interval_minutes: u64,
}

impl CalendarSyncScheduler {
    pub fn new(
        tokens: Arc<TokenService>,
        connections: Arc<dyn ConnectionRepository>,
        interval_minutes: u64,
    ) -> Self {
        Self {
            tokens,
            connections,
            interval_minutes,
        }
    }

    /// Queue one sync per active connection; a still-queued earlier sync is superseded
    pub async fn enqueue_all(&self) -> Result<usize> {
        let active = self.connections.list_active().await?;
        for connection in &active {
            self.tokens.enqueue_sync(connection).await?;
        }
        Ok(active.len())
    }

    /// Run until shutdown; should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(interval_minutes = self.interval_minutes, "Calendar sync scheduler started");

        let mut tick = interval(Duration::from_secs(self.interval_minutes.max(1) * 60));

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }
            if shutdown.is_shutdown() {
                break;
            }

            match self.enqueue_all().await {
                Ok(count) => info!(connections = count, "Calendar syncs queued"),
                Err(e) => error!(error = %e, "Failed to queue calendar syncs"),
            }
        }

        info!("Calendar sync scheduler stopped");
    }
}
