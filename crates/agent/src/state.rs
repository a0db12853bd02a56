use std::sync::Arc;

use haul_core::{Config, DownloadPipeline, SanitizedConfig, WebhookNotifier};

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: Arc<DownloadPipeline>,
    webhook: Arc<WebhookNotifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        pipeline: Arc<DownloadPipeline>,
        webhook: Arc<WebhookNotifier>,
    ) -> Self {
        Self {
            config,
            pipeline,
            webhook,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn pipeline(&self) -> &DownloadPipeline {
        &self.pipeline
    }

    /// The same notifier the pipeline delivers through.
    pub fn webhook(&self) -> &WebhookNotifier {
        &self.webhook
    }
}
