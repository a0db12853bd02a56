//! Executes a pending move once its download is ready.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::mover::{MoveReport, MoveRequest, Mover};
use crate::notifier::{Delivery, Notifier, NotifyError, OutcomeEvent};
use crate::registry::{MoveAction, PendingActionRegistry};
use crate::torrent_client::{TorrentClient, TorrentInfo};

use super::types::{ExecutionError, ExecutionOutcome};

/// Performs move, cleanup and notification for one item.
pub struct ActionExecutor {
    client: Arc<dyn TorrentClient>,
    mover: Arc<dyn Mover>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<PendingActionRegistry>,
    move_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        client: Arc<dyn TorrentClient>,
        mover: Arc<dyn Mover>,
        notifier: Arc<dyn Notifier>,
        registry: Arc<PendingActionRegistry>,
        move_timeout: Duration,
    ) -> Self {
        Self {
            client,
            mover,
            notifier,
            registry,
            move_timeout,
        }
    }

    /// Run the pending action for `item`, if this call wins it.
    ///
    /// The action is consumed whether or not the move succeeds; a failed
    /// attempt is reported and never retried.
    pub async fn execute(&self, item: &TorrentInfo) -> ExecutionOutcome {
        let Some(pending) = self.registry.take(&item.hash).await else {
            debug!(id = %item.hash, "Action not granted, skipping");
            return ExecutionOutcome::NotGranted;
        };

        let id = pending.id.clone();
        let target = pending.action.target_descriptor();
        info!(id = %id, name = %item.name, target = %target, "Starting move");

        let started = Instant::now();
        let result = self.run(item, &pending.action).await;
        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::MOVES_TOTAL.with_label_values(&[label]).inc();
        metrics::MOVE_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        let (event, outcome) = match result {
            Ok(report) => {
                info!(
                    id = %id,
                    name = %item.name,
                    destination = %report.destination,
                    "Move completed"
                );
                self.cleanup(&id).await;
                (
                    OutcomeEvent::completed(&id, &item.name, target, item.size_bytes),
                    ExecutionOutcome::Completed,
                )
            }
            Err(e) => {
                error!(id = %id, name = %item.name, target = %target, error = %e, "Move failed");
                (
                    OutcomeEvent::failed(&id, &item.name, Some(target), e.to_string()),
                    ExecutionOutcome::Failed(e),
                )
            }
        };

        // Released before delivery
        self.registry.release(&id).await;
        self.deliver(&event).await;

        outcome
    }

    async fn run(
        &self,
        item: &TorrentInfo,
        action: &MoveAction,
    ) -> Result<MoveReport, ExecutionError> {
        let files = self
            .client
            .list_files(&item.hash)
            .await
            .map_err(|e| ExecutionError::ContentListUnavailable(e.to_string()))?;
        if files.is_empty() {
            return Err(ExecutionError::ContentListUnavailable(
                "backend reported no files".to_string(),
            ));
        }

        let source = source_path(item)
            .ok_or_else(|| ExecutionError::MissingSourcePath(item.hash.clone()))?;

        let report = self
            .mover
            .move_content(MoveRequest::new(source, action, self.move_timeout))
            .await?;
        Ok(report)
    }

    /// Remove the source item and its data. Failure is logged only.
    async fn cleanup(&self, id: &str) {
        match self.client.remove_torrent(id, true).await {
            Ok(()) => debug!(id = %id, "Removed source download"),
            Err(e) => {
                metrics::CLEANUP_FAILURES.inc();
                warn!(id = %id, error = %e, "Failed to remove source download after move");
            }
        }
    }

    async fn deliver(&self, event: &OutcomeEvent) {
        let result = self.notifier.notify(event).await;
        let label = match &result {
            Ok(Delivery::Delivered) => "delivered",
            Ok(Delivery::Skipped) => "skipped",
            Err(NotifyError::Rejected { .. }) => "rejected",
            Err(_) => "failed",
        };
        metrics::NOTIFICATIONS_TOTAL.with_label_values(&[label]).inc();

        match result {
            Ok(Delivery::Delivered) => {
                info!(id = %event.id, kind = event.kind.as_str(), "Outcome delivered")
            }
            Ok(Delivery::Skipped) => {
                warn!(id = %event.id, "No webhook configured, outcome not delivered")
            }
            Err(e) => {
                warn!(id = %event.id, kind = event.kind.as_str(), error = %e, "Outcome delivery failed")
            }
        }
    }
}

/// Local path of the downloaded content.
fn source_path(item: &TorrentInfo) -> Option<PathBuf> {
    if let Some(content) = item.content_path.as_deref().filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(content));
    }
    item.save_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|save| PathBuf::from(save).join(&item.name))
}
