// Microsoft 365 adapter (identity platform v2.0 + Graph calendarView)

use crate::oauth::{api_error, request_tokens, to_rfc3339, transport_error, OAuthClientConfig};
use async_trait::async_trait;
use hireloop_core::domain::{CalendarProvider, OAuthTokens, TimeRange};
use hireloop_core::port::{CalendarProviderClient, ExternalBusy, ProviderError};
use serde::Deserialize;
use tracing::{debug, warn};

const SCOPE: &str = "offline_access Calendars.Read";
const MAX_PAGES: usize = 10;
const PAGE_SIZE: &str = "100";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrosoftEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub graph_base: String,
}

impl Default for MicrosoftEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                .to_string(),
            token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string(),
            graph_base: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }
}

pub struct MicrosoftCalendarClient {
    http: reqwest::Client,
    oauth: OAuthClientConfig,
    endpoints: MicrosoftEndpoints,
}

impl MicrosoftCalendarClient {
    pub fn new(http: reqwest::Client, oauth: OAuthClientConfig) -> Self {
        Self::with_endpoints(http, oauth, MicrosoftEndpoints::default())
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        oauth: OAuthClientConfig,
        endpoints: MicrosoftEndpoints,
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
                CalendarProvider::Microsoft.to_string(),
            ))
        }
    }

    fn first_page_url(&self, range: TimeRange) -> Result<String, ProviderError> {
        let start = to_rfc3339(range.start)?;
        let end = to_rfc3339(range.end)?;
        let url = reqwest::Url::parse_with_params(
            &format!("{}/me/calendarView", self.endpoints.graph_base),
            &[
                ("startDateTime", start.as_str()),
                ("endDateTime", end.as_str()),
                ("$select", "id,subject,start,end,showAs,isCancelled"),
                ("$top", PAGE_SIZE),
            ],
        )
        .map_err(|e| ProviderError::NotConfigured(format!("Graph URL: {}", e)))?;
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarViewPage {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: Option<String>,
    subject: Option<String>,
    start: GraphDateTime,
    end: GraphDateTime,
    #[serde(default)]
    show_as: Option<String>,
    #[serde(default)]
    is_cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    #[serde(default)]
    time_zone: Option<String>,
}

/// Graph returns wall-clock strings like `2024-01-01T10:00:00.0000000`;
/// requests carry `Prefer: outlook.timezone="UTC"` so only UTC is accepted
fn parse_graph_datetime(value: &GraphDateTime) -> Result<i64, ProviderError> {
    if let Some(tz) = &value.time_zone {
        if !tz.eq_ignore_ascii_case("UTC") {
            return Err(ProviderError::Decode(format!(
                "unexpected event time zone '{}'",
                tz
            )));
        }
    }
    chrono::NaiveDateTime::parse_from_str(&value.date_time, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|e| ProviderError::Decode(format!("bad dateTime '{}': {}", value.date_time, e)))
}

/// Events that block time: everything not shown as `free` and not cancelled
pub(crate) fn parse_calendar_view(
    page: &CalendarViewPage,
) -> Result<Vec<ExternalBusy>, ProviderError> {
    let mut busy = Vec::new();
    for event in &page.value {
        if event.is_cancelled {
            continue;
        }
        if event
            .show_as
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("free"))
        {
            continue;
        }
        let start = parse_graph_datetime(&event.start)?;
        let end = parse_graph_datetime(&event.end)?;
        if start < end {
            busy.push(ExternalBusy {
                range: TimeRange::from_bounds(start, end),
                external_id: event.id.clone(),
                title: event.subject.clone(),
            });
        }
    }
    Ok(busy)
}

#[async_trait]
impl CalendarProviderClient for MicrosoftCalendarClient {
    fn provider(&self) -> CalendarProvider {
        CalendarProvider::Microsoft
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;
        let url = reqwest::Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.oauth.client_id.as_str()),
                ("redirect_uri", self.oauth.redirect_uri.as_str()),
                ("response_type", "code"),
                ("response_mode", "query"),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::NotConfigured(format!("Microsoft auth URL: {}", e)))?;
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
                ("scope", SCOPE),
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
                ("scope", SCOPE),
            ],
        )
        .await
    }

    async fn fetch_busy(
        &self,
        access_token: &str,
        range: TimeRange,
    ) -> Result<Vec<ExternalBusy>, ProviderError> {
        let mut busy = Vec::new();
        let mut next = Some(self.first_page_url(range)?);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                warn!(pages = pages, "calendarView paging limit reached, truncating");
                break;
            }
            pages += 1;

            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .header("Prefer", "outlook.timezone=\"UTC\"")
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            let text = response.text().await.map_err(transport_error)?;
            if !status.is_success() {
                return Err(api_error(status, &text));
            }

            let page: CalendarViewPage = serde_json::from_str(&text)
                .map_err(|e| ProviderError::Decode(format!("calendarView response: {}", e)))?;
            busy.extend(parse_calendar_view(&page)?);
            next = page.next_link;
        }

        debug!(count = busy.len(), pages = pages, "Fetched Microsoft busy events");
        Ok(busy)
    }
}
