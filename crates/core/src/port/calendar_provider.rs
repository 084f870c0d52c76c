// Calendar Provider Port
// OAuth authorization-code flow and free/busy reads against an external calendar

use crate::domain::{CalendarProvider, OAuthTokens, TimeRange};
use async_trait::async_trait;
use thiserror::Error;

/// A busy interval reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBusy {
    pub range: TimeRange,
    pub external_id: Option<String>,
    pub title: Option<String>,
}

/// Provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Refresh token or authorization code rejected (RFC 6749 `invalid_grant`)
    #[error("Grant rejected by provider: {0}")]
    InvalidGrant(String),

    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    #[error("Provider rate limit hit")]
    RateLimited,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),

    #[error("Provider {0} is not configured")]
    NotConfigured(String),
}

impl ProviderError {
    /// Errors after which the stored grant can never work again
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::InvalidGrant(_) | ProviderError::Unauthorized(_)
        )
    }
}

/// Calendar provider client
///
/// Implementations:
/// - GoogleCalendarClient
/// - MicrosoftCalendarClient
#[async_trait]
pub trait CalendarProviderClient: Send + Sync {
    fn provider(&self) -> CalendarProvider;

    /// URL the user is redirected to for consent
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, ProviderError>;

    /// Obtain a new access token
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, ProviderError>;

    /// Busy intervals of the user's primary calendar within `range`
    async fn fetch_busy(
        &self,
        access_token: &str,
        range: TimeRange,
    ) -> Result<Vec<ExternalBusy>, ProviderError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scriptable provider client
    pub struct MockCalendarProvider {
        provider: CalendarProvider,
        exchange_result: Arc<Mutex<Result<OAuthTokens, ProviderError>>>,
        refresh_result: Arc<Mutex<Result<OAuthTokens, ProviderError>>>,
        busy_result: Arc<Mutex<Result<Vec<ExternalBusy>, ProviderError>>>,
        refresh_calls: Arc<Mutex<usize>>,
        fetch_calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockCalendarProvider {
        pub fn new(provider: CalendarProvider) -> Self {
            let tokens = OAuthTokens {
                access_token: "access-1".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_in_secs: 3600,
            };
            Self {
                provider,
                exchange_result: Arc::new(Mutex::new(Ok(tokens.clone()))),
                refresh_result: Arc::new(Mutex::new(Ok(OAuthTokens {
                    access_token: "access-refreshed".to_string(),
                    refresh_token: None,
                    expires_in_secs: 3600,
                }))),
                busy_result: Arc::new(Mutex::new(Ok(Vec::new()))),
                refresh_calls: Arc::new(Mutex::new(0)),
                fetch_calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn set_exchange_result(&self, result: Result<OAuthTokens, ProviderError>) {
            *self.exchange_result.lock().unwrap() = result;
        }

        pub fn set_refresh_result(&self, result: Result<OAuthTokens, ProviderError>) {
            *self.refresh_result.lock().unwrap() = result;
        }

        pub fn set_busy_result(&self, result: Result<Vec<ExternalBusy>, ProviderError>) {
            *self.busy_result.lock().unwrap() = result;
        }

        pub fn refresh_calls(&self) -> usize {
            *self.refresh_calls.lock().unwrap()
        }

        /// Access tokens passed to `fetch_busy`, in call order
        pub fn fetch_tokens(&self) -> Vec<String> {
            self.fetch_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CalendarProviderClient for MockCalendarProvider {
        fn provider(&self) -> CalendarProvider {
            self.provider
        }

        fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
            Ok(format!("https://auth.example.test/authorize?state={}", state))
        }

        async fn exchange_code(&self, _code: &str) -> Result<OAuthTokens, ProviderError> {
            self.exchange_result.lock().unwrap().clone()
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<OAuthTokens, ProviderError> {
            *self.refresh_calls.lock().unwrap() += 1;
            self.refresh_result.lock().unwrap().clone()
        }

        async fn fetch_busy(
            &self,
            access_token: &str,
            _range: TimeRange,
        ) -> Result<Vec<ExternalBusy>, ProviderError> {
            self.fetch_calls
                .lock()
                .unwrap()
                .push(access_token.to_string());
            self.busy_result.lock().unwrap().clone()
        }
    }
}
