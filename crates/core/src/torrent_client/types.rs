//! Types for torrent client operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// State of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Downloading from peers (includes metadata fetch).
    Downloading,
    /// Download finished, seeding to peers.
    Seeding,
    /// Download paused before completion.
    Paused,
    /// Download finished and the torrent is paused or stopped.
    Completed,
    /// Checking file integrity or moving storage.
    Checking,
    /// Queued for download or upload.
    Queued,
    /// Stalled while downloading (no peers).
    Stalled,
    /// Error state.
    Error,
    /// Unknown state.
    Unknown,
}

impl TorrentState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Completed => "completed",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Stalled => "stalled",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }

    /// Whether the torrent has left its transfer phase and its content is
    /// safe to relocate.
    pub fn is_ready(&self) -> bool {
        matches!(self, TorrentState::Seeding | TorrentState::Completed)
    }
}

/// Information about a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// When the torrent was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// When the torrent completed downloading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Save path on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    /// Absolute path of the torrent content (file or root folder).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    /// Category/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Tags attached to the torrent.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TorrentInfo {
    /// Whether the torrent carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A file inside a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent root.
    pub name: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// File progress (0.0 - 1.0).
    pub progress: f64,
}

/// Request to add a new torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentRequest {
    /// Magnet URI or URL of a .torrent file.
    pub source: String,
    /// Optional download path override.
    pub download_path: Option<String>,
    /// Optional category/label.
    pub category: Option<String>,
    /// Tags to attach.
    pub tags: Vec<String>,
}

impl AddTorrentRequest {
    /// Create a request with default options.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            download_path: None,
            category: None,
            tags: Vec::new(),
        }
    }

    /// Set the download path.
    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = Some(path.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, cat: impl Into<String>) -> Self {
        self.category = Some(cat.into());
        self
    }

    /// Attach a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// What the backend said about an add request.
///
/// The add call never returns the assigned hash; callers look it up afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddStatus {
    /// The backend accepted the request.
    Accepted,
    /// The backend explicitly refused it (duplicate, invalid source, ...).
    Rejected { reason: String },
}

/// Filters for listing torrents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentFilters {
    /// Filter by category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Filter by tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Sort by added time, newest first.
    #[serde(default)]
    pub newest_first: bool,
    /// Maximum number of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl TorrentFilters {
    /// Only torrents carrying `tag`.
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    /// The `limit` most recently added torrents, newest first.
    pub fn recent(limit: usize) -> Self {
        Self {
            newest_first: true,
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Check if any filters are set.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tag.is_none() && !self.newest_first && self.limit.is_none()
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Submit a new torrent.
    async fn add_torrent(&self, request: AddTorrentRequest)
        -> Result<AddStatus, TorrentClientError>;

    /// List torrents, optionally filtered.
    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Get a specific torrent by hash.
    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError>;

    /// List the files of a torrent.
    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError>;

    /// Remove a torrent.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torrent_state_as_str() {
        assert_eq!(TorrentState::Downloading.as_str(), "downloading");
        assert_eq!(TorrentState::Seeding.as_str(), "seeding");
        assert_eq!(TorrentState::Completed.as_str(), "completed");
        assert_eq!(TorrentState::Stalled.as_str(), "stalled");
        assert_eq!(TorrentState::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_ready_states() {
        assert!(TorrentState::Seeding.is_ready());
        assert!(TorrentState::Completed.is_ready());

        for state in [
            TorrentState::Downloading,
            TorrentState::Paused,
            TorrentState::Checking,
            TorrentState::Queued,
            TorrentState::Stalled,
            TorrentState::Error,
            TorrentState::Unknown,
        ] {
            assert!(!state.is_ready(), "{} should not be ready", state.as_str());
        }
    }

    #[test]
    fn test_torrent_state_serialization() {
        assert_eq!(
            serde_json::to_string(&TorrentState::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_add_torrent_request_builder() {
        let req = AddTorrentRequest::new("magnet:?xt=urn:btih:abc123")
            .with_download_path("/downloads")
            .with_category("movies")
            .with_tag("haul-1");

        assert_eq!(req.source, "magnet:?xt=urn:btih:abc123");
        assert_eq!(req.download_path.as_deref(), Some("/downloads"));
        assert_eq!(req.category.as_deref(), Some("movies"));
        assert_eq!(req.tags, vec!["haul-1".to_string()]);
    }

    #[test]
    fn test_torrent_filters() {
        assert!(TorrentFilters::default().is_empty());

        let tagged = TorrentFilters::tagged("haul-1");
        assert_eq!(tagged.tag.as_deref(), Some("haul-1"));
        assert!(!tagged.is_empty());

        let recent = TorrentFilters::recent(10);
        assert!(recent.newest_first);
        assert_eq!(recent.limit, Some(10));
    }

    #[test]
    fn test_has_tag() {
        let info = TorrentInfo {
            hash: "abc".to_string(),
            name: "Test".to_string(),
            state: TorrentState::Downloading,
            progress: 0.0,
            size_bytes: 0,
            added_at: None,
            completed_at: None,
            save_path: None,
            content_path: None,
            category: None,
            tags: vec!["a".to_string(), "haul-x".to_string()],
        };
        assert!(info.has_tag("haul-x"));
        assert!(!info.has_tag("haul"));
    }
}
