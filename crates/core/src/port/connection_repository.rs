// Calendar Connection Repository Port (connections, pending OAuth states)

use crate::domain::{CalendarConnection, CalendarProvider, OAuthState};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Insert, or overwrite the existing row for (tenant, user, provider)
    ///
    /// # Returns
    /// The stored connection (keeps the existing ID on overwrite)
    async fn upsert(&self, connection: &CalendarConnection) -> Result<CalendarConnection>;

    async fn update(&self, connection: &CalendarConnection) -> Result<()>;

    async fn find_by_id(
        &self,
        tenant_id: &str,
        connection_id: &str,
    ) -> Result<Option<CalendarConnection>>;

    async fn find_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>>;

    /// Active connections across all tenants (periodic sync)
    async fn list_active(&self) -> Result<Vec<CalendarConnection>>;

    async fn save_state(&self, state: &OAuthState) -> Result<()>;

    /// Remove and return a pending state (single use)
    async fn take_state(&self, state: &str) -> Result<Option<OAuthState>>;
}
