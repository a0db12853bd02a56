//! Best-effort delivery of outcome events to an external subscriber.

mod types;
mod webhook;

pub use types::*;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;

/// Delivers outcome events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the name of this notifier implementation.
    fn name(&self) -> &str;

    /// Whether an endpoint is configured.
    async fn is_configured(&self) -> bool;

    /// Deliver one event. Never retried by callers.
    async fn notify(&self, event: &OutcomeEvent) -> Result<Delivery, NotifyError>;
}
