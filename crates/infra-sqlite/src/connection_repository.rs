// SQLite ConnectionRepository Implementation (calendar connections, OAuth states)

use crate::error::{map_sqlx_error, parse_column};
use async_trait::async_trait;
use hireloop_core::domain::{CalendarConnection, CalendarProvider, ConnectionStatus, OAuthState};
use hireloop_core::error::{AppError, Result};
use hireloop_core::port::ConnectionRepository;
use sqlx::SqlitePool;

pub struct SqliteConnectionRepository {
    pool: SqlitePool,
}

impl SqliteConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRepository for SqliteConnectionRepository {
    async fn upsert(&self, connection: &CalendarConnection) -> Result<CalendarConnection> {
        // The unique (tenant, user, provider) row keeps its id and created_at
        let row: ConnectionRow = sqlx::query_as(
            r#"
            INSERT INTO calendar_connections (
                id, tenant_id, user_id, provider, access_token, refresh_token,
                expires_at, status, last_synced_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id, user_id, provider) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                status = excluded.status,
                last_synced_at = excluded.last_synced_at,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&connection.id)
        .bind(&connection.tenant_id)
        .bind(&connection.user_id)
        .bind(connection.provider.to_string())
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.expires_at)
        .bind(connection.status.to_string())
        .bind(connection.last_synced_at)
        .bind(connection.created_at)
        .bind(connection.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.into_connection()
    }

    async fn update(&self, connection: &CalendarConnection) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE calendar_connections
            SET access_token = ?, refresh_token = ?, expires_at = ?, status = ?,
                last_synced_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.expires_at)
        .bind(connection.status.to_string())
        .bind(connection.last_synced_at)
        .bind(connection.updated_at)
        .bind(&connection.tenant_id)
        .bind(&connection.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Calendar connection", &connection.id));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &str,
        connection_id: &str,
    ) -> Result<Option<CalendarConnection>> {
        let row: Option<ConnectionRow> =
            sqlx::query_as("SELECT * FROM calendar_connections WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(connection_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(ConnectionRow::into_connection).transpose()
    }

    async fn find_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        provider: CalendarProvider,
    ) -> Result<Option<CalendarConnection>> {
        let row: Option<ConnectionRow> = sqlx::query_as(
            "SELECT * FROM calendar_connections WHERE tenant_id = ? AND user_id = ? AND provider = ?",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(provider.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(ConnectionRow::into_connection).transpose()
    }

    async fn list_active(&self) -> Result<Vec<CalendarConnection>> {
        let rows: Vec<ConnectionRow> = sqlx::query_as(
            "SELECT * FROM calendar_connections WHERE status = ? ORDER BY tenant_id, created_at",
        )
        .bind(ConnectionStatus::Active.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(ConnectionRow::into_connection).collect()
    }

    async fn save_state(&self, state: &OAuthState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth_states (state, tenant_id, user_id, provider, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&state.state)
        .bind(&state.tenant_id)
        .bind(&state.user_id)
        .bind(state.provider.to_string())
        .bind(state.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn take_state(&self, state: &str) -> Result<Option<OAuthState>> {
        let row: Option<(String, String, String, String, i64)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_states WHERE state = ?
            RETURNING state, tenant_id, user_id, provider, expires_at
            "#,
        )
        .bind(state)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|(state, tenant_id, user_id, provider, expires_at)| {
            Ok(OAuthState {
                provider: parse_column("oauth_states.provider", &provider)?,
                state,
                tenant_id,
                user_id,
                expires_at,
            })
        })
        .transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: String,
    tenant_id: String,
    user_id: String,
    provider: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    status: String,
    last_synced_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl ConnectionRow {
    fn into_connection(self) -> Result<CalendarConnection> {
        Ok(CalendarConnection {
            provider: parse_column("calendar_connections.provider", &self.provider)?,
            status: parse_column("calendar_connections.status", &self.status)?,
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            last_synced_at: self.last_synced_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory_repository::tests::seed_tenant_with_user;
    use crate::test_support::memory_pool;
    use hireloop_core::domain::OAuthTokens;

    async fn setup() -> SqliteConnectionRepository {
        let pool = memory_pool().await;
        seed_tenant_with_user(&pool, "acme", "u-1").await;
        SqliteConnectionRepository::new(pool)
    }

    fn connection(id: &str, now: i64) -> CalendarConnection {
        let mut conn = CalendarConnection {
            id: id.to_string(),
            tenant_id: "acme".to_string(),
            user_id: "u-1".to_string(),
            provider: CalendarProvider::Google,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            status: ConnectionStatus::Active,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        conn.apply_tokens(
            OAuthTokens {
                access_token: format!("access-{}", id),
                refresh_token: Some("refresh".to_string()),
                expires_in_secs: 3600,
            },
            now,
        );
        conn
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_id() {
        let repo = setup().await;

        let first = repo.upsert(&connection("conn-1", 1_000)).await.unwrap();
        assert_eq!(first.id, "conn-1");

        let second = repo.upsert(&connection("conn-2", 2_000)).await.unwrap();
        assert_eq!(second.id, "conn-1");
        assert_eq!(second.created_at, 1_000);
        assert_eq!(second.access_token.as_deref(), Some("access-conn-2"));
        assert_eq!(second.updated_at, 2_000);
    }

    #[tokio::test]
    async fn test_list_active_excludes_disconnected() {
        let repo = setup().await;
        let mut conn = repo.upsert(&connection("conn-1", 1_000)).await.unwrap();
        assert_eq!(repo.list_active().await.unwrap().len(), 1);

        conn.disconnect(2_000);
        repo.update(&conn).await.unwrap();

        assert!(repo.list_active().await.unwrap().is_empty());
        let stored = repo
            .find_for_user("acme", "u-1", CalendarProvider::Google)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ConnectionStatus::Disconnected);
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_take_state_is_single_use() {
        let repo = setup().await;
        let state = OAuthState {
            state: "st-1".to_string(),
            tenant_id: "acme".to_string(),
            user_id: "u-1".to_string(),
            provider: CalendarProvider::Microsoft,
            expires_at: 10_000,
        };
        repo.save_state(&state).await.unwrap();

        assert_eq!(repo.take_state("st-1").await.unwrap(), Some(state));
        assert!(repo.take_state("st-1").await.unwrap().is_none());
    }
}
