//! Error types for the mover module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving content to a remote store.
#[derive(Debug, Error)]
pub enum MoverError {
    /// Mover binary not found.
    #[error("Mover binary not found: {path}")]
    BinaryNotFound { path: String },

    /// Source content does not exist locally.
    #[error("Source not found: {path}")]
    SourceMissing { path: PathBuf },

    /// The mover exited unsuccessfully.
    #[error("Move command failed (exit code {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    /// The move exceeded its time budget and was killed.
    #[error("Move timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the mover.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
