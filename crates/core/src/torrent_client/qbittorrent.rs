//! qBittorrent torrent client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{
    AddStatus, AddTorrentRequest, TorrentClient, TorrentClientError, TorrentFile, TorrentFilters,
    TorrentInfo, TorrentState,
};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (the SID cookie itself lives in the cookie jar).
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.session.write().await = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request, logging in again once on HTTP 403.
    ///
    /// `build` is called per attempt because multipart bodies cannot be cloned.
    async fn send<F>(&self, build: F) -> Result<Response, TorrentClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let response = build(&self.client)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        warn!("qBittorrent session expired, re-authenticating");
        self.session.write().await.take();
        self.login().await?;

        build(&self.client).send().await.map_err(map_request_error)
    }

    /// Authenticated GET returning the body of a successful response.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        let response = self.send(|client| client.get(&url)).await?;
        success_body(response).await
    }

    /// Authenticated POST with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        let response = self.send(|client| client.post(&url).form(params)).await?;
        success_body(response).await
    }

    fn add_form(&self, request: &AddTorrentRequest) -> multipart::Form {
        let mut form = multipart::Form::new().text("urls", request.source.clone());

        if let Some(path) = &request.download_path {
            form = form.text("savepath", path.clone());
        }
        if let Some(cat) = &request.category {
            form = form.text("category", cat.clone());
        }
        if !request.tags.is_empty() {
            form = form.text("tags", request.tags.join(","));
        }
        form
    }
}

/// Map a reqwest failure to a client error.
fn map_request_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

async fn success_body(response: Response) -> Result<String, TorrentClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
    }
    response
        .text()
        .await
        .map_err(|e| TorrentClientError::ApiError(e.to_string()))
}

/// Interpret the response of `/api/v2/torrents/add`.
///
/// Older versions answer `Fails.` with HTTP 200; newer ones use 409/415.
fn parse_add_response(status: StatusCode, body: &str) -> Result<AddStatus, TorrentClientError> {
    match status {
        StatusCode::CONFLICT => Ok(AddStatus::Rejected {
            reason: "torrent already present or could not be added".to_string(),
        }),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => Ok(AddStatus::Rejected {
            reason: "torrent source is not valid".to_string(),
        }),
        s if s.is_success() => {
            if body.trim().starts_with("Fails.") {
                Ok(AddStatus::Rejected {
                    reason: "backend refused the torrent".to_string(),
                })
            } else {
                Ok(AddStatus::Accepted)
            }
        }
        s => Err(TorrentClientError::ApiError(format!("HTTP {}", s))),
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    size: i64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    completion_on: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    content_path: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            progress: self.progress,
            size_bytes: self.size.max(0) as u64,
            added_at: timestamp_to_datetime(self.added_on),
            completed_at: timestamp_to_datetime(self.completion_on),
            save_path: non_empty(self.save_path),
            content_path: non_empty(self.content_path),
            category: non_empty(self.category),
            tags: parse_tags(&self.tags),
        }
    }
}

/// qBittorrent file entry.
#[derive(Debug, Deserialize)]
struct QBTorrentFile {
    name: String,
    size: i64,
    #[serde(default)]
    progress: f64,
}

/// Parse qBittorrent state string to TorrentState.
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" | "allocating" => {
            TorrentState::Downloading
        }
        "uploading" | "forcedUP" | "stalledUP" => TorrentState::Seeding,
        "pausedUP" | "stoppedUP" => TorrentState::Completed,
        "pausedDL" | "stoppedDL" => TorrentState::Paused,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" => TorrentState::Checking,
        "queuedDL" | "queuedUP" => TorrentState::Queued,
        "stalledDL" => TorrentState::Stalled,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

/// qBittorrent reports tags as a single comma-separated string.
fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Convert Unix timestamp to DateTime<Utc>.
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

fn info_endpoint(filters: &TorrentFilters) -> String {
    let mut endpoint = "/api/v2/torrents/info".to_string();
    let mut query_parts = Vec::new();

    if let Some(category) = &filters.category {
        query_parts.push(format!("category={}", urlencoding::encode(category)));
    }
    if let Some(tag) = &filters.tag {
        query_parts.push(format!("tag={}", urlencoding::encode(tag)));
    }
    if filters.newest_first {
        query_parts.push("sort=added_on".to_string());
        query_parts.push("reverse=true".to_string());
    }
    if let Some(limit) = filters.limit {
        query_parts.push(format!("limit={}", limit));
    }

    if !query_parts.is_empty() {
        endpoint.push('?');
        endpoint.push_str(&query_parts.join("&"));
    }
    endpoint
}

fn parse_torrent_list(body: &str) -> Result<Vec<TorrentInfo>, TorrentClientError> {
    let torrents: Vec<QBTorrentInfo> = serde_json::from_str(body)
        .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;
    Ok(torrents.into_iter().map(|t| t.into_torrent_info()).collect())
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddStatus, TorrentClientError> {
        let url = self.url("/api/v2/torrents/add");
        let response = self
            .send(|client| client.post(&url).multipart(self.add_form(&request)))
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        parse_add_response(status, &body)
    }

    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let body = self.get(&info_endpoint(filters)).await?;
        let mut results = parse_torrent_list(&body)?;

        // Older versions ignore sort/limit parameters
        if filters.newest_first {
            results.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        }
        if let Some(limit) = filters.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let body = self
            .get(&format!("/api/v2/torrents/info?hashes={}", hash_lower))
            .await?;

        parse_torrent_list(&body)?
            .into_iter()
            .find(|t| t.hash == hash_lower)
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let url = self.url(&format!("/api/v2/torrents/files?hash={}", hash_lower));
        let response = self.send(|client| client.get(&url)).await?;

        // Unknown hashes answer 404
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        }
        let body = success_body(response).await?;

        let files: Vec<QBTorrentFile> = serde_json::from_str(&body)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(files
            .into_iter()
            .map(|f| TorrentFile {
                name: f.name,
                size_bytes: f.size.max(0) as u64,
                progress: f.progress,
            })
            .collect())
    }

    async fn remove_torrent(&self, hash: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &hash_lower), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_qb_state_downloading() {
        assert_eq!(parse_qb_state("downloading"), TorrentState::Downloading);
        assert_eq!(parse_qb_state("forcedDL"), TorrentState::Downloading);
        assert_eq!(parse_qb_state("metaDL"), TorrentState::Downloading);
    }

    #[test]
    fn test_parse_qb_state_ready() {
        assert_eq!(parse_qb_state("uploading"), TorrentState::Seeding);
        assert_eq!(parse_qb_state("stalledUP"), TorrentState::Seeding);
        assert_eq!(parse_qb_state("pausedUP"), TorrentState::Completed);
        assert_eq!(parse_qb_state("stoppedUP"), TorrentState::Completed);
        assert!(parse_qb_state("stalledUP").is_ready());
        assert!(parse_qb_state("pausedUP").is_ready());
    }

    #[test]
    fn test_parse_qb_state_not_ready() {
        for state in [
            "downloading",
            "metaDL",
            "pausedDL",
            "stalledDL",
            "checkingUP",
            "queuedUP",
            "missingFiles",
            "something_else",
        ] {
            assert!(!parse_qb_state(state).is_ready(), "{} should not be ready", state);
        }
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags("haul-abc, movies"),
            vec!["haul-abc".to_string(), "movies".to_string()]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_parse_add_response() {
        assert_eq!(
            parse_add_response(StatusCode::OK, "Ok.").unwrap(),
            AddStatus::Accepted
        );
        assert!(matches!(
            parse_add_response(StatusCode::OK, "Fails.").unwrap(),
            AddStatus::Rejected { .. }
        ));
        assert!(matches!(
            parse_add_response(StatusCode::CONFLICT, "").unwrap(),
            AddStatus::Rejected { .. }
        ));
        assert!(matches!(
            parse_add_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, "").unwrap(),
            AddStatus::Rejected { .. }
        ));
        assert!(parse_add_response(StatusCode::INTERNAL_SERVER_ERROR, "").is_err());
    }

    #[test]
    fn test_info_endpoint_query() {
        assert_eq!(
            info_endpoint(&TorrentFilters::default()),
            "/api/v2/torrents/info"
        );
        assert_eq!(
            info_endpoint(&TorrentFilters::tagged("haul-1 2")),
            "/api/v2/torrents/info?tag=haul-1%202"
        );
        assert_eq!(
            info_endpoint(&TorrentFilters::recent(10)),
            "/api/v2/torrents/info?sort=added_on&reverse=true&limit=10"
        );
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let dt = timestamp_to_datetime(1703980800).unwrap();
        assert_eq!(dt.year(), 2023);
        assert!(timestamp_to_datetime(-1).is_none());
        assert!(timestamp_to_datetime(0).is_none());
    }

    #[test]
    fn test_parse_torrent_list() {
        let body = r#"[{
            "hash": "ABC123",
            "name": "Test Torrent",
            "state": "pausedUP",
            "progress": 1.0,
            "size": 1000000,
            "added_on": 1703980800,
            "completion_on": 1703984400,
            "save_path": "/downloads",
            "content_path": "/downloads/Test Torrent",
            "category": "movies",
            "tags": "haul-abc"
        }]"#;

        let list = parse_torrent_list(body).unwrap();
        assert_eq!(list.len(), 1);
        let info = &list[0];
        assert_eq!(info.hash, "abc123"); // lowercase
        assert_eq!(info.state, TorrentState::Completed);
        assert_eq!(info.size_bytes, 1000000);
        assert_eq!(info.content_path.as_deref(), Some("/downloads/Test Torrent"));
        assert_eq!(info.category.as_deref(), Some("movies"));
        assert!(info.has_tag("haul-abc"));
        assert!(info.completed_at.is_some());
    }

    #[test]
    fn test_parse_torrent_list_tolerates_missing_fields() {
        let body = r#"[{"hash": "a", "name": "n", "state": "downloading", "progress": 0.1, "size": -1}]"#;
        let list = parse_torrent_list(body).unwrap();
        assert_eq!(list[0].size_bytes, 0);
        assert!(list[0].tags.is_empty());
        assert!(list[0].save_path.is_none());
    }
}
