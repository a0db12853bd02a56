//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notifier::{Delivery, Notifier, NotifyError, OutcomeEvent};
use crate::registry::PendingActionRegistry;

/// Mock implementation of the Notifier trait.
///
/// Records delivered events. Can be switched to unconfigured or failing, and
/// can record whether an item was still active while its event was delivered.
#[derive(Debug)]
pub struct MockNotifier {
    events: Arc<RwLock<Vec<OutcomeEvent>>>,
    configured: Arc<RwLock<bool>>,
    fail: Arc<RwLock<bool>>,
    observed: Arc<RwLock<Option<(Arc<PendingActionRegistry>, String)>>>,
    active_during_delivery: Arc<RwLock<Vec<bool>>>,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotifier {
    /// Create a configured, succeeding mock notifier.
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            configured: Arc::new(RwLock::new(true)),
            fail: Arc::new(RwLock::new(false)),
            observed: Arc::new(RwLock::new(None)),
            active_during_delivery: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Events received so far (including failed deliveries).
    pub async fn events(&self) -> Vec<OutcomeEvent> {
        self.events.read().await.clone()
    }

    pub async fn set_configured(&self, configured: bool) {
        *self.configured.write().await = configured;
    }

    /// Fail every delivery with a transport error.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Record whether `id` is active in `registry` at each delivery.
    pub async fn observe_registry(&self, registry: Arc<PendingActionRegistry>, id: &str) {
        *self.observed.write().await = Some((registry, id.to_string()));
    }

    pub async fn active_during_delivery(&self) -> Vec<bool> {
        self.active_during_delivery.read().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_configured(&self) -> bool {
        *self.configured.read().await
    }

    async fn notify(&self, event: &OutcomeEvent) -> Result<Delivery, NotifyError> {
        if let Some((registry, id)) = self.observed.read().await.as_ref() {
            let active = registry.is_active(id).await;
            self.active_during_delivery.write().await.push(active);
        }

        if !*self.configured.read().await {
            return Ok(Delivery::Skipped);
        }

        self.events.write().await.push(event.clone());

        if *self.fail.read().await {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(Delivery::Delivered)
    }
}
