//! Pipeline runner: owns the registry and drives the monitor loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::{MonitorConfig, ResolverConfig};
use crate::mover::Mover;
use crate::notifier::Notifier;
use crate::registry::{MoveAction, PendingActionRegistry, RegisterOutcome};
use crate::resolver::{DestinationHints, IdentityResolver, SourceLocator};
use crate::torrent_client::TorrentClient;

use super::executor::ActionExecutor;
use super::monitor::CompletionMonitor;
use super::types::{
    PendingStatus, PipelineError, PipelineStatus, ScanReport, SubmitRequest, SubmitResult,
};

/// The download-to-archive pipeline.
///
/// Owns the registry and wires the resolver, monitor and executor together.
/// `start()` spawns the monitor loop; `stop()` signals it and waits for the
/// current scan to finish.
pub struct DownloadPipeline {
    config: MonitorConfig,
    registry: Arc<PendingActionRegistry>,
    resolver: IdentityResolver,
    monitor: Arc<CompletionMonitor>,
    notifier: Arc<dyn Notifier>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadPipeline {
    pub fn new(
        monitor_config: MonitorConfig,
        resolver_config: ResolverConfig,
        client: Arc<dyn TorrentClient>,
        mover: Arc<dyn Mover>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let registry = Arc::new(PendingActionRegistry::new());
        let executor = ActionExecutor::new(
            Arc::clone(&client),
            mover,
            Arc::clone(&notifier),
            Arc::clone(&registry),
            monitor_config.move_timeout(),
        );
        let monitor = Arc::new(CompletionMonitor::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            executor,
            monitor_config.pending_ttl(),
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config: monitor_config,
            registry,
            resolver: IdentityResolver::new(client, resolver_config),
            monitor,
            notifier,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Start the monitor loop. The first scan runs immediately.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Pipeline already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let monitor = Arc::clone(&self.monitor);
        let period = self.config.scan_interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "Completion monitor started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Completion monitor received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        monitor.scan().await;
                    }
                }
            }
            info!("Completion monitor stopped");
        });

        *self.task.lock().await = Some(handle);
    }

    /// Stop the monitor loop, letting an in-progress scan finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Pipeline not running");
            return;
        }

        info!("Stopping pipeline");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Completion monitor task failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &Arc<PendingActionRegistry> {
        &self.registry
    }

    /// Submit a download, wait for its id and register its move action.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResult, PipelineError> {
        let locator = SourceLocator::parse(&request.locator)?;
        let hints = DestinationHints {
            destination_path: request.destination_path,
            category_label: request.category_label,
        };
        let resolution = self.resolver.resolve(locator, hints).await?;
        let id = resolution.item.id;

        let action_registered = match request.action {
            Some(action) => match self.registry.register(&id, action).await {
                RegisterOutcome::Busy => {
                    warn!(id = %id, "Download is executing a move, action not registered");
                    false
                }
                _ => {
                    info!(id = %id, "Move action registered");
                    true
                }
            },
            None => false,
        };

        Ok(SubmitResult {
            id,
            display_name: resolution.item.display_name,
            action_registered,
        })
    }

    /// Register (or replace) the move action for an already known id.
    pub async fn register_action(
        &self,
        id: &str,
        action: MoveAction,
    ) -> Result<RegisterOutcome, PipelineError> {
        match self.registry.register(id, action).await {
            RegisterOutcome::Busy => Err(PipelineError::Busy(id.to_lowercase())),
            outcome => {
                info!(id = %id, ?outcome, "Move action registered");
                Ok(outcome)
            }
        }
    }

    /// Run one scan now, outside the timer.
    pub async fn scan_now(&self) -> ScanReport {
        self.monitor.scan().await
    }

    /// Run one scan as of `now`.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> ScanReport {
        self.monitor.scan_at(now).await
    }

    pub async fn status(&self) -> PipelineStatus {
        let snapshot = self.registry.snapshot().await;
        let now = Utc::now();

        PipelineStatus {
            running: self.is_running(),
            scan_interval_ms: self.config.scan_interval_ms,
            pending: snapshot
                .pending
                .iter()
                .map(|p| PendingStatus {
                    id: p.id.clone(),
                    target: p.action.target_descriptor(),
                    registered_at: p.registered_at,
                    age_secs: p.age(now).num_seconds(),
                })
                .collect(),
            active: snapshot.active,
            webhook_configured: self.notifier.is_configured().await,
        }
    }
}
