// External Calendar Domain Model (connections, OAuth tokens)

use crate::domain::availability::BusySource;
use crate::domain::directory::{TenantId, UserId};
use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};

pub type ConnectionId = String;

/// Supported external calendar providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarProvider {
    Google,
    Microsoft,
}

impl CalendarProvider {
    /// Busy blocks synced from this provider carry this source
    pub fn busy_source(&self) -> BusySource {
        match self {
            CalendarProvider::Google => BusySource::Google,
            CalendarProvider::Microsoft => BusySource::Microsoft,
        }
    }
}

impl std::fmt::Display for CalendarProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarProvider::Google => write!(f, "GOOGLE"),
            CalendarProvider::Microsoft => write!(f, "MICROSOFT"),
        }
    }
}

impl std::str::FromStr for CalendarProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOOGLE" => Ok(CalendarProvider::Google),
            "MICROSOFT" => Ok(CalendarProvider::Microsoft),
            other => Err(DomainError::ValidationError(format!(
                "Unknown calendar provider: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Active,
    /// Access token expired and no refresh token is available
    Expired,
    /// Provider rejected the refresh token
    Revoked,
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Active => write!(f, "ACTIVE"),
            ConnectionStatus::Expired => write!(f, "EXPIRED"),
            ConnectionStatus::Revoked => write!(f, "REVOKED"),
            ConnectionStatus::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ConnectionStatus::Active),
            "EXPIRED" => Ok(ConnectionStatus::Expired),
            "REVOKED" => Ok(ConnectionStatus::Revoked),
            "DISCONNECTED" => Ok(ConnectionStatus::Disconnected),
            other => Err(DomainError::ValidationError(format!(
                "Unknown connection status: {}",
                other
            ))),
        }
    }
}

/// Tokens returned by a provider's token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in_secs: i64,
}

/// A user's link to an external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConnection {
    pub id: ConnectionId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub provider: CalendarProvider,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub status: ConnectionStatus,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CalendarConnection {
    /// Apply freshly issued tokens; a missing refresh token keeps the stored one
    pub fn apply_tokens(&mut self, tokens: OAuthTokens, now_millis: i64) {
        self.access_token = Some(tokens.access_token);
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
        self.expires_at = Some(now_millis + tokens.expires_in_secs * 1000);
        self.status = ConnectionStatus::Active;
        self.updated_at = now_millis;
    }

    /// True if the access token is valid for at least `skew_ms` more
    pub fn has_fresh_token(&self, now_millis: i64, skew_ms: i64) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => {
                self.status == ConnectionStatus::Active && expires_at - now_millis > skew_ms
            }
            _ => false,
        }
    }

    pub fn disconnect(&mut self, now_millis: i64) {
        self.access_token = None;
        self.refresh_token = None;
        self.expires_at = None;
        self.status = ConnectionStatus::Disconnected;
        self.updated_at = now_millis;
    }

    /// Subject key of this connection's sync jobs
    pub fn sync_subject(&self) -> String {
        format!("connection:{}:sync", self.id)
    }
}

/// Pending authorization awaiting the provider redirect (single use)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub provider: CalendarProvider,
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> CalendarConnection {
        CalendarConnection {
            id: "conn-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            user_id: "user-1".to_string(),
            provider: CalendarProvider::Google,
            access_token: Some("old-access".to_string()),
            refresh_token: Some("old-refresh".to_string()),
            expires_at: Some(10_000),
            status: ConnectionStatus::Active,
            last_synced_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_apply_tokens_keeps_refresh_token_when_absent() {
        let mut conn = connection();
        conn.apply_tokens(
            OAuthTokens {
                access_token: "new-access".to_string(),
                refresh_token: None,
                expires_in_secs: 3600,
            },
            5_000,
        );
        assert_eq!(conn.access_token.as_deref(), Some("new-access"));
        assert_eq!(conn.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(conn.expires_at, Some(5_000 + 3_600_000));
    }

    #[test]
    fn test_fresh_token_respects_skew() {
        let conn = connection();
        assert!(conn.has_fresh_token(4_000, 5_000));
        assert!(!conn.has_fresh_token(5_000, 5_000));
    }

    #[test]
    fn test_revoked_connection_is_never_fresh() {
        let mut conn = connection();
        conn.status = ConnectionStatus::Revoked;
        assert!(!conn.has_fresh_token(0, 0));
    }

    #[test]
    fn test_disconnect_clears_tokens() {
        let mut conn = connection();
        conn.disconnect(7_000);
        assert!(conn.access_token.is_none());
        assert!(conn.refresh_token.is_none());
        assert_eq!(conn.status, ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_provider_maps_to_busy_source() {
        assert_eq!(CalendarProvider::Google.busy_source(), BusySource::Google);
        assert_eq!(
            CalendarProvider::Microsoft.busy_source(),
            BusySource::Microsoft
        );
    }
}
