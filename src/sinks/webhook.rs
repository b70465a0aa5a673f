//! Webhook notifier.
//!
//! Posts alert and status messages as JSON to an HTTP endpoint, e.g. a
//! home-automation hub or a mail relay.

use crate::sinks::{NotificationSink, SendError};
use chrono::Utc;
use serde::Serialize;

/// Webhook endpoint configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Full URL messages are POSTed to
    pub url: String,
    /// Optional bearer token
    pub token: Option<String>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
        }
    }
}

/// JSON body of one notification.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub topic: String,
    pub message: String,
    pub host: String,
    /// RFC3339 send time
    pub sent_at: String,
    pub version: String,
}

/// Async webhook client.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
    host: String,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| SendError::Transport(format!("Failed to create HTTP client: {e}")))?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(Self {
            config,
            client,
            host,
        })
    }

    pub fn payload(&self, topic: &str, message: &str) -> WebhookPayload {
        WebhookPayload {
            topic: topic.to_string(),
            message: message.to_string(),
            host: self.host.clone(),
            sent_at: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub async fn send(&self, topic: &str, message: &str) -> Result<(), SendError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&self.payload(topic, message));

        if let Some(ref token) = self.config.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Blocking webhook client for the single-threaded scheduler.
pub struct BlockingWebhookNotifier {
    inner: WebhookNotifier,
    runtime: tokio::runtime::Runtime,
}

impl BlockingWebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, SendError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SendError::Transport(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: WebhookNotifier::new(config)?,
            runtime,
        })
    }
}

impl NotificationSink for BlockingWebhookNotifier {
    fn send(&mut self, topic: &str, message: &str) -> Result<(), SendError> {
        self.runtime.block_on(self.inner.send(topic, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_fields() {
        let notifier =
            WebhookNotifier::new(WebhookConfig::new("http://127.0.0.1:9/hook", None)).unwrap();
        let payload = notifier.payload("RadonMonitor/Alert", "Radon: Red");
        assert_eq!(payload.topic, "RadonMonitor/Alert");
        assert_eq!(payload.message, "Radon: Red");
        assert!(!payload.host.is_empty());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["sent_at"].as_str().is_some());
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let mut notifier =
            BlockingWebhookNotifier::new(WebhookConfig::new("http://127.0.0.1:9/hook", None))
                .unwrap();
        let result = notifier.send("RadonMonitor/Alert", "test");
        assert!(matches!(result, Err(SendError::Transport(_))));
    }
}
