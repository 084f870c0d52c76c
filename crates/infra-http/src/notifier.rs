// Notifier adapters: structured log line and JSON webhook

use async_trait::async_trait;
use hireloop_core::port::{Notification, Notifier, NotifyError};
use tracing::{info, warn};

/// Writes each notification as one structured log event
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let interviewers: Vec<&str> = notification
            .interviewers
            .iter()
            .map(|r| r.email.as_str())
            .collect();

        info!(
            kind = ?notification.kind,
            tenant_id = %notification.tenant_id,
            interview_id = %notification.interview_id,
            title = %notification.title,
            start = notification.range.start,
            end = notification.range.end,
            candidate = %notification.candidate.email,
            interviewers = ?interviewers,
            "Notification dispatched"
        );
        Ok(())
    }
}

/// POSTs the notification as JSON to a configured URL
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        warn!(
            interview_id = %notification.interview_id,
            status = %status,
            "Webhook rejected notification"
        );

        // 4xx will not succeed on retry except for throttling
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(NotifyError::Rejected(format!("webhook returned {}", status)))
        } else {
            Err(NotifyError::Transport(format!("webhook returned {}", status)))
        }
    }
}
