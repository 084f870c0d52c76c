// OAuth 2.0 authorization-code plumbing shared by both providers

use hireloop_core::domain::OAuthTokens;
use hireloop_core::port::ProviderError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Credentials registered with a provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// RFC 6749 §5.1 token response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// RFC 6749 §5.2 error response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Providers omit expires_in on some grants; assume one hour
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

impl From<TokenResponse> for OAuthTokens {
    fn from(resp: TokenResponse) -> Self {
        OAuthTokens {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in_secs: resp.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        }
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

/// Classify a non-success token endpoint response
pub(crate) fn token_error(status: StatusCode, body: &str) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited;
    }
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" => ProviderError::InvalidGrant(
            err.error_description.unwrap_or_else(|| err.error.clone()),
        ),
        Ok(err) if err.error == "invalid_client" || err.error == "unauthorized_client" => {
            ProviderError::Unauthorized(err.error_description.unwrap_or(err.error))
        }
        Ok(err) => ProviderError::Transport(format!(
            "{} ({}): {}",
            status,
            err.error,
            err.error_description.unwrap_or_default()
        )),
        Err(_) => ProviderError::Transport(format!("token endpoint returned {}", status)),
    }
}

/// Classify a non-success calendar API response
pub(crate) fn api_error(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized(format!("{}: {}", status, truncate(body)))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        _ => ProviderError::Transport(format!("{}: {}", status, truncate(body))),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// POST a form to a token endpoint and decode the token response
pub(crate) async fn request_tokens(
    http: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<OAuthTokens, ProviderError> {
    let response = http
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    debug!(url = %token_url, status = %status, "Token endpoint responded");

    if !status.is_success() {
        return Err(token_error(status, &body));
    }

    serde_json::from_str::<TokenResponse>(&body)
        .map(OAuthTokens::from)
        .map_err(|e| ProviderError::Decode(format!("token response: {}", e)))
}

/// Epoch ms -> RFC 3339 UTC, as both calendar APIs expect
pub(crate) fn to_rfc3339(millis: i64) -> Result<String, ProviderError> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .ok_or_else(|| ProviderError::Decode(format!("timestamp out of range: {}", millis)))
}
