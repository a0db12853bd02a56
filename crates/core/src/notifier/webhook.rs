use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::NotifierConfig;

use super::{Delivery, Notifier, NotifyError, OutcomeEvent};

/// Posts outcome events as JSON to a webhook URL.
///
/// The URL can be replaced at runtime; with no URL every event is skipped.
pub struct WebhookNotifier {
    client: Client,
    url: RwLock<Option<String>>,
    api_key: Option<String>,
    api_key_header: String,
}

impl WebhookNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let url = match &config.url {
            Some(url) => Some(parse_url(url)?),
            None => None,
        };

        Ok(Self {
            client,
            url: RwLock::new(url),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_key_header: config.api_key_header.clone(),
        })
    }

    /// Current webhook URL.
    pub async fn url(&self) -> Option<String> {
        self.url.read().await.clone()
    }

    /// Replace the webhook URL. `None` disables delivery.
    pub async fn set_url(&self, url: Option<&str>) -> Result<(), NotifyError> {
        let parsed = match url {
            Some(url) => Some(parse_url(url)?),
            None => None,
        };
        info!(url = ?parsed, "Webhook URL updated");
        *self.url.write().await = parsed;
        Ok(())
    }
}

fn parse_url(url: &str) -> Result<String, NotifyError> {
    reqwest::Url::parse(url)
        .map(|u| u.to_string())
        .map_err(|e| NotifyError::InvalidUrl(format!("{}: {}", url, e)))
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn is_configured(&self) -> bool {
        self.url.read().await.is_some()
    }

    async fn notify(&self, event: &OutcomeEvent) -> Result<Delivery, NotifyError> {
        let Some(url) = self.url().await else {
            return Ok(Delivery::Skipped);
        };

        let mut request = self.client.post(&url).json(event);
        if let Some(key) = &self.api_key {
            request = request.header(self.api_key_header.as_str(), key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NotifyError::Timeout
            } else {
                NotifyError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(url = %url, kind = event.kind.as_str(), id = %event.id, "Webhook delivered");
        Ok(Delivery::Delivered)
    }
}
