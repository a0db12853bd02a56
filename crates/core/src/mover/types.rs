//! Types for the mover module.

use std::path::PathBuf;
use std::time::Duration;

use crate::registry::MoveAction;

/// A single move of local content to a remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Local file or directory to move.
    pub source_path: PathBuf,
    /// Remote store name (e.g. `remote1:`).
    pub target_store: String,
    /// Path inside the store.
    pub target_path: String,
    /// Upper bound for this attempt.
    pub timeout: Duration,
}

impl MoveRequest {
    pub fn new(source_path: impl Into<PathBuf>, action: &MoveAction, timeout: Duration) -> Self {
        Self {
            source_path: source_path.into(),
            target_store: action.target_store.clone(),
            target_path: action.target_path.clone(),
            timeout,
        }
    }

    /// Destination in `<store><path>` form.
    pub fn destination(&self) -> String {
        format!("{}{}", self.target_store, self.target_path)
    }
}

/// Outcome of a successful move.
#[derive(Debug, Clone)]
pub struct MoveReport {
    /// Destination the content was moved to.
    pub destination: String,
    /// Wall-clock duration of the move.
    pub duration: Duration,
}
