// Google Calendar adapter (OAuth 2.0 + FreeBusy API)

use crate::oauth::{api_error, request_tokens, to_rfc3339, transport_error, OAuthClientConfig};
use async_trait::async_trait;
use hireloop_core::domain::{CalendarProvider, OAuthTokens, TimeRange};
use hireloop_core::port::{CalendarProviderClient, ExternalBusy, ProviderError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const PRIMARY_CALENDAR: &str = "primary";

/// Overridable for tests and proxies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
        }
    }
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    oauth: OAuthClientConfig,
    endpoints: GoogleEndpoints,
}

impl GoogleCalendarClient {
    pub fn new(http: reqwest::Client, oauth: OAuthClientConfig) -> Self {
        Self::with_endpoints(http, oauth, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        oauth: OAuthClientConfig,
        endpoints: GoogleEndpoints,
    ) -> Self {
        Self {
            http,
            oauth,
            endpoints,
        }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.oauth.is_configured() {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                CalendarProvider::Google.to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    reason: String,
}

fn parse_instant(value: &str) -> Result<i64, ProviderError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| ProviderError::Decode(format!("bad timestamp '{}': {}", value, e)))
}

/// Busy periods of the primary calendar; empty periods are dropped
pub(crate) fn parse_free_busy(
    response: FreeBusyResponse,
) -> Result<Vec<ExternalBusy>, ProviderError> {
    let calendar = match response.calendars.get(PRIMARY_CALENDAR) {
        Some(calendar) => calendar,
        None => return Ok(Vec::new()),
    };

    if let Some(err) = calendar.errors.first() {
        return Err(ProviderError::Decode(format!(
            "freeBusy reported error for primary calendar: {}",
            err.reason
        )));
    }

    let mut busy = Vec::with_capacity(calendar.busy.len());
    for period in &calendar.busy {
        let start = parse_instant(&period.start)?;
        let end = parse_instant(&period.end)?;
        if start < end {
            busy.push(ExternalBusy {
                range: TimeRange::from_bounds(start, end),
                external_id: None,
                title: None,
            });
        }
    }
    Ok(busy)
}

#[async_trait]
impl CalendarProviderClient for GoogleCalendarClient {
    fn provider(&self) -> CalendarProvider {
        CalendarProvider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;
        let url = reqwest::Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.oauth.client_id.as_str()),
                ("redirect_uri", self.oauth.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::NotConfigured(format!("Google auth URL: {}", e)))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, ProviderError> {
        self.ensure_configured()?;
        request_tokens(
            &self.http,
            &self.endpoints.token_url,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.oauth.client_id.as_str()),
                ("client_secret", self.oauth.client_secret.as_str()),
                ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ],
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, ProviderError> {
        self.ensure_configured()?;
        request_tokens(
            &self.http,
            &self.endpoints.token_url,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.oauth.client_id.as_str()),
                ("client_secret", self.oauth.client_secret.as_str()),
            ],
        )
        .await
    }

    async fn fetch_busy(
        &self,
        access_token: &str,
        range: TimeRange,
    ) -> Result<Vec<ExternalBusy>, ProviderError> {
        let url = format!("{}/calendar/v3/freeBusy", self.endpoints.api_base);
        let body = serde_json::json!({
            "timeMin": to_rfc3339(range.start)?,
            "timeMax": to_rfc3339(range.end)?,
            "items": [{ "id": PRIMARY_CALENDAR }],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let parsed: FreeBusyResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Decode(format!("freeBusy response: {}", e)))?;
        let busy = parse_free_busy(parsed)?;
        debug!(count = busy.len(), "Fetched Google busy periods");
        Ok(busy)
    }
}
