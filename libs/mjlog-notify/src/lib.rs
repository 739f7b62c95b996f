//! # mjlog-crawler Notification Adapters
//!
//! - [`WebhookNotifier`]: posts `{"text": ...}` to an incoming-webhook URL
//! - [`NoopNotifier`]: accepts every message, used when no channel is configured
//! - [`NotifierBackend`]: the closed set of the above, chosen once at startup

use std::time::Duration;

use mjlog_domain::{ingestion::NotifyError, ports::Notifier};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Default timeout for a webhook call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while building a [`WebhookNotifier`]
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Notifier posting messages to an incoming webhook (Slack, Discord /slack, Mattermost...)
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the underlying HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    fn notify(&self, message: &str) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send {
        let request = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { text: message });

        async move {
            let response = request.send().await.map_err(|e| {
                warn!(error = %e, "Failed to send webhook");
                NotifyError::request(e.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                warn!(status = %status, "Webhook rejected notification");
                return Err(NotifyError::Status {
                    status: status.as_u16(),
                });
            }

            debug!("Webhook sent successfully");
            Ok(())
        }
    }
}

/// Notifier that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, message: &str) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send {
        debug!(message_len = message.len(), "Notifications disabled, dropping message");
        async { Ok(()) }
    }
}

/// Notification channel selected by configuration
#[derive(Clone)]
pub enum NotifierBackend {
    Webhook(WebhookNotifier),
    Disabled(NoopNotifier),
}

impl NotifierBackend {
    /// Webhook notifier when a URL is configured, no-op otherwise
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the webhook client cannot be built.
    pub fn from_url(url: Option<&str>, timeout: Duration) -> Result<Self, WebhookError> {
        match url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => {
                info!("Notifications enabled (webhook)");
                Ok(Self::Webhook(WebhookNotifier::new(url, timeout)?))
            }
            None => {
                info!("No webhook configured, notifications disabled");
                Ok(Self::Disabled(NoopNotifier))
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Webhook(_))
    }
}

impl Notifier for NotifierBackend {
    fn notify(&self, message: &str) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send {
        async move {
            match self {
                Self::Webhook(notifier) => notifier.notify(message).await,
                Self::Disabled(notifier) => notifier.notify(message).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        assert!(NoopNotifier.notify("hello").await.is_ok());
    }

    #[test]
    fn test_backend_without_url_is_disabled() {
        let backend = NotifierBackend::from_url(None, DEFAULT_TIMEOUT).unwrap();
        assert!(!backend.is_enabled());

        let backend = NotifierBackend::from_url(Some("  "), DEFAULT_TIMEOUT).unwrap();
        assert!(!backend.is_enabled());
    }

    #[test]
    fn test_backend_with_url_is_enabled() {
        let backend =
            NotifierBackend::from_url(Some("https://hooks.example.com/x"), DEFAULT_TIMEOUT)
                .unwrap();
        assert!(backend.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_backend_succeeds() {
        let backend = NotifierBackend::from_url(None, DEFAULT_TIMEOUT).unwrap();
        assert!(backend.notify("hello").await.is_ok());
    }
}
