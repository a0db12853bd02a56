//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::resolver::SourceLocator;
use crate::torrent_client::{
    AddStatus, AddTorrentRequest, TorrentClient, TorrentClientError, TorrentFile, TorrentFilters,
    TorrentInfo, TorrentState,
};

/// A recorded torrent addition for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAddTorrent {
    /// The request that was made.
    pub request: AddTorrentRequest,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Internal state for a mock torrent.
#[derive(Debug, Clone)]
struct MockTorrentState {
    info: TorrentInfo,
    files: Vec<TorrentFile>,
}

/// Knobs that change how the mock behaves.
#[derive(Debug, Default)]
struct Behavior {
    /// Reason for rejecting the next add call.
    reject_next_add: Option<String>,
    /// Return every torrent regardless of the tag filter.
    ignore_tag_filter: bool,
    /// Hide tags from returned torrents.
    hide_tags: bool,
    /// Accept adds without ever creating the torrent.
    hold_additions: bool,
    /// Fail every remove call.
    fail_removals: bool,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Track added and removed torrents for assertions
/// - Control torrent state and file listings
/// - Simulate backends that ignore tag filters or never show a torrent
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
///
/// client.add_torrent(AddTorrentRequest::new("magnet:?xt=urn:btih:...")).await?;
/// assert_eq!(client.added_torrents().await.len(), 1);
///
/// // Simulate completion
/// client.set_state(hash, TorrentState::Seeding).await;
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Recorded add_torrent calls.
    added: Arc<RwLock<Vec<RecordedAddTorrent>>>,
    /// Recorded remove_torrent calls (hash, delete_files).
    removed: Arc<RwLock<Vec<(String, bool)>>>,
    /// Current torrent states by hash.
    torrents: Arc<RwLock<HashMap<String, MockTorrentState>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    behavior: Arc<RwLock<Behavior>>,
    /// Counter for generating unique hashes.
    hash_counter: Arc<RwLock<u32>>,
    /// Default save path for new torrents.
    default_save_path: String,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self {
            added: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            torrents: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            behavior: Arc::new(RwLock::new(Behavior::default())),
            hash_counter: Arc::new(RwLock::new(0)),
            default_save_path: "/mock/downloads".to_string(),
        }
    }

    /// Create a mock client with a custom save path.
    pub fn with_save_path(save_path: impl Into<String>) -> Self {
        Self {
            default_save_path: save_path.into(),
            ..Self::new()
        }
    }

    /// Get all recorded add_torrent calls.
    pub async fn added_torrents(&self) -> Vec<RecordedAddTorrent> {
        self.added.read().await.clone()
    }

    /// Get all recorded remove_torrent calls.
    pub async fn removed_torrents(&self) -> Vec<(String, bool)> {
        self.removed.read().await.clone()
    }

    /// Set the state for a torrent directly.
    ///
    /// Ready states also mark the torrent fully downloaded.
    pub async fn set_state(&self, hash: &str, state: TorrentState) {
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.get_mut(&hash.to_lowercase()) {
            torrent.info.state = state;
            if state.is_ready() {
                torrent.info.progress = 1.0;
                torrent.info.completed_at.get_or_insert_with(Utc::now);
            }
        }
    }

    /// Replace the file listing of a torrent.
    pub async fn set_files(&self, hash: &str, files: Vec<TorrentFile>) {
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.get_mut(&hash.to_lowercase()) {
            torrent.files = files;
        }
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Whether an injected error is still waiting to be returned.
    pub async fn has_pending_error(&self) -> bool {
        self.next_error.read().await.is_some()
    }

    /// Reject the next add call, like a backend answering `Fails.`.
    pub async fn reject_next_add(&self, reason: impl Into<String>) {
        self.behavior.write().await.reject_next_add = Some(reason.into());
    }

    /// Behave like a backend without tag filter support.
    pub async fn set_ignore_tag_filter(&self, ignore: bool) {
        self.behavior.write().await.ignore_tag_filter = ignore;
    }

    /// Whether returned torrents carry their tags.
    pub async fn set_report_tags(&self, report: bool) {
        self.behavior.write().await.hide_tags = !report;
    }

    /// Accept adds but never create the torrent.
    pub async fn set_hold_additions(&self, hold: bool) {
        self.behavior.write().await.hold_additions = hold;
    }

    /// Fail every remove call.
    pub async fn set_fail_removals(&self, fail: bool) {
        self.behavior.write().await.fail_removals = fail;
    }

    /// Check if a torrent exists.
    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.torrents.read().await.contains_key(&hash.to_lowercase())
    }

    /// Get the number of torrents.
    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Pre-populate a downloading torrent added just now.
    pub async fn seed_torrent(&self, hash: &str, name: &str) {
        let info = self.new_info(hash.to_lowercase(), name.to_string(), None, None, Vec::new());
        self.add_mock_torrent(info).await;
    }

    /// Pre-populate a torrent (for testing get/list operations).
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        let files = default_files(&info);
        self.torrents
            .write()
            .await
            .insert(info.hash.to_lowercase(), MockTorrentState { info, files });
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }

    /// Generate a unique mock hash.
    async fn generate_hash(&self) -> String {
        let mut counter = self.hash_counter.write().await;
        *counter += 1;
        format!("{:040x}", *counter)
    }

    fn new_info(
        &self,
        hash: String,
        name: String,
        save_path: Option<String>,
        category: Option<String>,
        tags: Vec<String>,
    ) -> TorrentInfo {
        let save_path = save_path.unwrap_or_else(|| self.default_save_path.clone());
        TorrentInfo {
            content_path: Some(format!("{}/{}", save_path.trim_end_matches('/'), name)),
            hash,
            name,
            state: TorrentState::Downloading,
            progress: 0.0,
            size_bytes: 100 * 1024 * 1024, // 100 MB default
            added_at: Some(Utc::now()),
            completed_at: None,
            save_path: Some(save_path),
            category,
            tags,
        }
    }

    async fn visible(&self, info: &TorrentInfo) -> TorrentInfo {
        let mut info = info.clone();
        if self.behavior.read().await.hide_tags {
            info.tags.clear();
        }
        info
    }
}

fn default_files(info: &TorrentInfo) -> Vec<TorrentFile> {
    vec![TorrentFile {
        name: info.name.clone(),
        size_bytes: info.size_bytes,
        progress: info.progress,
    }]
}

/// Display name for a locator, the way a backend would show it.
fn display_name(source: &str, hash: &str) -> String {
    if let Some(name) = source
        .split(['?', '&'])
        .find_map(|part| part.strip_prefix("dn="))
    {
        return name.replace('+', " ");
    }
    if !source.starts_with("magnet:") {
        if let Some(file) = source.rsplit('/').next().filter(|f| !f.is_empty()) {
            return file.trim_end_matches(".torrent").to_string();
        }
    }
    format!("Mock Torrent {}", &hash[..8.min(hash.len())])
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddStatus, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        // Record the request
        self.added.write().await.push(RecordedAddTorrent {
            request: request.clone(),
            timestamp: Utc::now(),
        });

        if let Some(reason) = self.behavior.write().await.reject_next_add.take() {
            return Ok(AddStatus::Rejected { reason });
        }

        let derived = SourceLocator::parse(&request.source)
            .ok()
            .and_then(|l| l.derived_id().map(str::to_string));
        let hash = match derived {
            Some(hash) => hash,
            None => self.generate_hash().await,
        };

        if self.torrents.read().await.contains_key(&hash) {
            return Ok(AddStatus::Rejected {
                reason: "torrent already present".to_string(),
            });
        }
        if self.behavior.read().await.hold_additions {
            return Ok(AddStatus::Accepted);
        }

        let name = display_name(&request.source, &hash);
        let info = self.new_info(
            hash,
            name,
            request.download_path.clone(),
            request.category.clone(),
            request.tags.clone(),
        );
        self.add_mock_torrent(info).await;

        Ok(AddStatus::Accepted)
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let ignore_tag_filter = self.behavior.read().await.ignore_tag_filter;
        let torrents = self.torrents.read().await;
        let mut result: Vec<TorrentInfo> = torrents
            .values()
            .filter(|t| {
                // Apply category filter
                if let Some(category) = &filters.category {
                    if t.info.category.as_ref() != Some(category) {
                        return false;
                    }
                }
                // Apply tag filter
                if let Some(tag) = &filters.tag {
                    if !ignore_tag_filter && !t.info.has_tag(tag) {
                        return false;
                    }
                }
                true
            })
            .map(|t| t.info.clone())
            .collect();
        drop(torrents);

        // Sort by added_at descending
        result.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(a.hash.cmp(&b.hash)));
        if let Some(limit) = filters.limit {
            result.truncate(limit);
        }

        let mut visible = Vec::with_capacity(result.len());
        for info in &result {
            visible.push(self.visible(info).await);
        }
        Ok(visible)
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let info = self
            .torrents
            .read()
            .await
            .get(&hash.to_lowercase())
            .map(|t| t.info.clone())
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))?;
        Ok(self.visible(&info).await)
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.torrents
            .read()
            .await
            .get(&hash.to_lowercase())
            .map(|t| t.files.clone())
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn remove_torrent(&self, hash: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.behavior.read().await.fail_removals {
            return Err(TorrentClientError::ApiError("HTTP 500".to_string()));
        }

        let hash = hash.to_lowercase();
        if self.torrents.write().await.remove(&hash).is_some() {
            self.removed.write().await.push((hash, delete_files));
            Ok(())
        } else {
            Err(TorrentClientError::TorrentNotFound(hash))
        }
    }
}
