// Hireloop Infrastructure - HTTP Adapters
// Implements: CalendarProviderClient (Google, Microsoft), Notifier (log, webhook)

pub mod google;
pub mod microsoft;
pub mod notifier;
pub mod oauth;

pub use google::{GoogleCalendarClient, GoogleEndpoints};
pub use microsoft::{MicrosoftCalendarClient, MicrosoftEndpoints};
pub use notifier::{LogNotifier, WebhookNotifier};
pub use oauth::OAuthClientConfig;

use std::time::Duration;

/// Per-request timeout for every outbound call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared reqwest client with the adapter timeout
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("hireloop/", env!("CARGO_PKG_VERSION")))
        .build()
}
