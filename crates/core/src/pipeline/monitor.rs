//! Periodic detection of finished downloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::metrics;
use crate::registry::PendingActionRegistry;
use crate::torrent_client::{TorrentClient, TorrentFilters, TorrentInfo};

use super::executor::ActionExecutor;
use super::types::{ExecutionOutcome, ScanReport};

/// Clears the scan flag when the scan ends, however it ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Scans the backend for pending items that reached a ready state.
pub struct CompletionMonitor {
    client: Arc<dyn TorrentClient>,
    registry: Arc<PendingActionRegistry>,
    executor: ActionExecutor,
    pending_ttl: chrono::Duration,
    scanning: AtomicBool,
}

impl CompletionMonitor {
    pub fn new(
        client: Arc<dyn TorrentClient>,
        registry: Arc<PendingActionRegistry>,
        executor: ActionExecutor,
        pending_ttl: chrono::Duration,
    ) -> Self {
        Self {
            client,
            registry,
            executor,
            pending_ttl,
            scanning: AtomicBool::new(false),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub async fn scan(&self) -> ScanReport {
        self.scan_at(Utc::now()).await
    }

    /// Run one scan as of `now`.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> ScanReport {
        if self.scanning.swap(true, Ordering::SeqCst) {
            metrics::SCANS_SKIPPED.inc();
            debug!("Previous scan still running, skipping tick");
            return ScanReport {
                skipped: true,
                ..Default::default()
            };
        }
        let _guard = ScanGuard(&self.scanning);

        let mut report = ScanReport::default();
        if self.registry.is_empty().await {
            return report;
        }
        let _timer = metrics::SCAN_DURATION.start_timer();

        let purged = self.registry.purge_stale(now, self.pending_ttl).await;
        for entry in &purged {
            warn!(
                id = %entry.id,
                target = %entry.action.target_descriptor(),
                registered_at = %entry.registered_at,
                "Pending action expired before its download finished, dropping it"
            );
        }
        report.purged = purged.len();
        metrics::PENDING_PURGED.inc_by(purged.len() as u64);

        let pending = self.registry.pending_ids().await;
        if pending.is_empty() {
            return report;
        }

        let items = match self.client.list_torrents(&TorrentFilters::default()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to list downloads, will retry next tick");
                return report;
            }
        };
        let by_id: HashMap<String, &TorrentInfo> = items
            .iter()
            .map(|item| (item.hash.to_lowercase(), item))
            .collect();

        // Sequential within a tick
        for id in pending {
            report.checked += 1;

            let Some(item) = by_id.get(&id) else {
                debug!(id = %id, "Pending download not listed by backend");
                continue;
            };
            if !item.state.is_ready() {
                debug!(id = %id, state = item.state.as_str(), progress = item.progress, "Still waiting");
                continue;
            }

            match self.executor.execute(item).await {
                ExecutionOutcome::Completed => report.executed += 1,
                ExecutionOutcome::Failed(_) => report.failed += 1,
                ExecutionOutcome::NotGranted => {}
            }
        }

        debug!(?report, "Scan finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MoveAction;
    use crate::testing::{MockMover, MockNotifier, MockTorrentClient};
    use crate::torrent_client::{TorrentClientError, TorrentState};
    use std::time::Duration;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    struct Harness {
        client: Arc<MockTorrentClient>,
        mover: Arc<MockMover>,
        registry: Arc<PendingActionRegistry>,
        monitor: Arc<CompletionMonitor>,
    }

    fn harness() -> Harness {
        let client = Arc::new(MockTorrentClient::new());
        let mover = Arc::new(MockMover::new());
        let registry = Arc::new(PendingActionRegistry::new());
        let executor = ActionExecutor::new(
            client.clone(),
            mover.clone(),
            Arc::new(MockNotifier::new()),
            registry.clone(),
            Duration::from_secs(60),
        );
        let monitor = Arc::new(CompletionMonitor::new(
            client.clone(),
            registry.clone(),
            executor,
            chrono::Duration::hours(24),
        ));
        Harness {
            client,
            mover,
            registry,
            monitor,
        }
    }

    fn action() -> MoveAction {
        MoveAction::new("remote1:", "/movies/")
    }

    #[tokio::test]
    async fn test_empty_registry_skips_listing() {
        let h = harness();
        h.client
            .set_next_error(TorrentClientError::ConnectionFailed("down".into()))
            .await;

        let report = h.monitor.scan().await;
        assert_eq!(report, ScanReport::default());
        // The injected error was never consumed
        assert!(h.client.has_pending_error().await);
    }

    #[tokio::test]
    async fn test_only_ready_items_execute() {
        let h = harness();
        h.client.seed_torrent(A, "Ready").await;
        h.client.set_state(A, TorrentState::Completed).await;
        h.client.seed_torrent(B, "Busy").await;
        h.client.set_state(B, TorrentState::Downloading).await;
        h.registry.register(A, action()).await;
        h.registry.register(B, action()).await;

        let report = h.monitor.scan().await;
        assert_eq!(report.checked, 2);
        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(h.registry.pending_ids().await, vec![B.to_string()]);
    }

    #[tokio::test]
    async fn test_scan_records_duration() {
        let h = harness();
        h.client.seed_torrent(A, "Ready").await;
        h.client.set_state(A, TorrentState::Completed).await;
        h.registry.register(A, action()).await;

        let before = metrics::SCAN_DURATION.get_sample_count();
        h.monitor.scan().await;
        assert!(metrics::SCAN_DURATION.get_sample_count() > before);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_tick() {
        let h = harness();
        for hash in [A, B] {
            h.client.seed_torrent(hash, hash).await;
            h.client.set_state(hash, TorrentState::Seeding).await;
            h.registry.register(hash, action()).await;
        }
        h.mover.fail_next("boom").await;

        let report = h.monitor.scan().await;
        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 1);
        assert!(h.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_failure_keeps_pending() {
        let h = harness();
        h.registry.register(A, action()).await;
        h.client
            .set_next_error(TorrentClientError::Timeout)
            .await;

        let report = h.monitor.scan().await;
        assert_eq!(report.checked, 0);
        assert_eq!(h.registry.pending_ids().await, vec![A.to_string()]);
    }

    #[tokio::test]
    async fn test_unlisted_item_keeps_waiting() {
        let h = harness();
        h.registry.register(A, action()).await;

        let report = h.monitor.scan().await;
        assert_eq!(report.checked, 1);
        assert_eq!(report.executed, 0);
        assert!(!h.registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_scan_is_skipped() {
        let h = harness();
        h.client.seed_torrent(A, "Slow").await;
        h.client.set_state(A, TorrentState::Seeding).await;
        h.registry.register(A, action()).await;
        h.mover.set_delay(Duration::from_secs(30)).await;

        let monitor = h.monitor.clone();
        let first = tokio::spawn(async move { monitor.scan().await });
        while !h.monitor.is_scanning() {
            tokio::task::yield_now().await;
        }

        let second = h.monitor.scan().await;
        assert!(second.skipped);

        let first = first.await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.executed, 1);
        assert!(!h.monitor.is_scanning());
    }
}
