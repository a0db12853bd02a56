//! Types for the download pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mover::MoverError;
use crate::registry::MoveAction;
use crate::resolver::ResolverError;

/// Errors that end one execution attempt.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Content listing unavailable: {0}")]
    ContentListUnavailable(String),

    #[error("Cannot determine source path for {0}")]
    MissingSourcePath(String),

    #[error("Move failed: {0}")]
    MoveFailed(#[from] MoverError),
}

/// What happened when the executor was handed an item.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The item was not pending or is already executing.
    NotGranted,
    Completed,
    Failed(ExecutionError),
}

/// Errors surfaced to pipeline callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("Item {0} is executing its action right now")]
    Busy(String),
}

/// Result of one monitor scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// The scan did not run because the previous one was still in progress.
    pub skipped: bool,
    /// Stale pending actions removed.
    pub purged: usize,
    /// Pending ids examined.
    pub checked: usize,
    /// Actions that completed.
    pub executed: usize,
    /// Actions that failed.
    pub failed: usize,
}

/// A download submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Magnet URI or .torrent URL.
    pub locator: String,
    pub destination_path: Option<String>,
    pub category_label: Option<String>,
    /// Move to run once the download completes.
    pub action: Option<MoveAction>,
}

/// Identity of a submitted download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub id: String,
    pub display_name: String,
    /// Whether a move action was registered.
    pub action_registered: bool,
}

/// A pending action as shown in status output.
#[derive(Debug, Clone, Serialize)]
pub struct PendingStatus {
    pub id: String,
    pub target: String,
    pub registered_at: DateTime<Utc>,
    pub age_secs: i64,
}

/// Current state of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub running: bool,
    pub scan_interval_ms: u64,
    pub pending: Vec<PendingStatus>,
    pub active: Vec<String>,
    pub webhook_configured: bool,
}
