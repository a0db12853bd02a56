//! Types for identity resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::torrent_client::{AddTorrentRequest, TorrentClientError, TorrentInfo};

use super::locator;
use super::Matcher;

/// Errors raised while resolving the identity of a submission.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Invalid source locator: {0}")]
    InvalidLocator(String),

    #[error("Backend rejected the submission: {reason}")]
    AddRejected { reason: String },

    #[error("Download did not appear within {waited_ms} ms")]
    ResolutionTimeout { waited_ms: u64 },

    #[error("Torrent client error: {0}")]
    Client(#[from] TorrentClientError),
}

/// How the backend obtains the torrent metadata for a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Magnet URI; the info hash can be read off the locator itself.
    SelfDescribing,
    /// Link to a .torrent file the backend has to download first.
    RemoteFetch,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::SelfDescribing => "self_describing",
            LocatorKind::RemoteFetch => "remote_fetch",
        }
    }
}

/// A classified source locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    raw: String,
    kind: LocatorKind,
    derived_id: Option<String>,
}

impl SourceLocator {
    /// Classify a locator. Magnet URIs are self-describing, anything else is
    /// fetched remotely by the backend.
    pub fn parse(raw: &str) -> Result<Self, ResolverError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ResolverError::InvalidLocator(
                "locator is empty".to_string(),
            ));
        }

        let is_magnet = raw
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:"));

        if is_magnet {
            Ok(Self {
                raw: raw.to_string(),
                kind: LocatorKind::SelfDescribing,
                derived_id: locator::derive_info_hash(raw),
            })
        } else {
            Ok(Self {
                raw: raw.to_string(),
                kind: LocatorKind::RemoteFetch,
                derived_id: None,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    /// Info hash read off the locator (lowercase hex), if any.
    pub fn derived_id(&self) -> Option<&str> {
        self.derived_id.as_deref()
    }
}

/// Optional destination hints supplied with a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationHints {
    pub destination_path: Option<String>,
    pub category_label: Option<String>,
}

/// One submit call, as handed to the backend.
#[derive(Debug, Clone)]
pub struct AddSubmission {
    pub source_locator: SourceLocator,
    pub destination_path: Option<String>,
    pub category_label: Option<String>,
    pub correlation_tag: String,
    pub submitted_at: DateTime<Utc>,
}

impl AddSubmission {
    pub fn new(
        source_locator: SourceLocator,
        hints: DestinationHints,
        correlation_tag: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_locator,
            destination_path: hints.destination_path,
            category_label: hints.category_label,
            correlation_tag: correlation_tag.into(),
            submitted_at,
        }
    }

    /// Build the backend add request, carrying the correlation tag.
    pub fn to_add_request(&self) -> AddTorrentRequest {
        let mut request = AddTorrentRequest::new(self.source_locator.as_str())
            .with_tag(self.correlation_tag.clone());
        if let Some(path) = &self.destination_path {
            request = request.with_download_path(path.clone());
        }
        if let Some(category) = &self.category_label {
            request = request.with_category(category.clone());
        }
        request
    }
}

/// A backend item the submission resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&TorrentInfo> for ResolvedItem {
    fn from(info: &TorrentInfo) -> Self {
        Self {
            id: info.hash.to_lowercase(),
            display_name: info.name.clone(),
            created_at: info.added_at,
            destination_path: info.save_path.clone(),
            category_label: info.category.clone(),
            tags: info.tags.clone(),
        }
    }
}

/// What produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The backend rejected the add and the item was already present.
    Duplicate,
    /// A matcher in the polling chain found the item.
    Matched(Matcher),
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Duplicate => "duplicate",
            ResolutionSource::Matched(matcher) => matcher.as_str(),
        }
    }
}

/// Successful identity resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub item: ResolvedItem,
    pub source: ResolutionSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_parse_magnet_hex() {
        let locator =
            SourceLocator::parse(&format!("magnet:?xt=urn:btih:{}&dn=Movie", HASH.to_uppercase()))
                .unwrap();
        assert_eq!(locator.kind(), LocatorKind::SelfDescribing);
        assert_eq!(locator.derived_id(), Some(HASH));
    }

    #[test]
    fn test_parse_magnet_without_hash_is_still_self_describing() {
        let locator = SourceLocator::parse("magnet:?dn=nothing").unwrap();
        assert_eq!(locator.kind(), LocatorKind::SelfDescribing);
        assert_eq!(locator.derived_id(), None);
    }

    #[test]
    fn test_parse_remote_link() {
        let locator = SourceLocator::parse("  https://tracker.example/file.torrent ").unwrap();
        assert_eq!(locator.kind(), LocatorKind::RemoteFetch);
        assert_eq!(locator.as_str(), "https://tracker.example/file.torrent");
        assert!(locator.derived_id().is_none());
    }

    #[test]
    fn test_parse_empty_locator_fails() {
        assert!(matches!(
            SourceLocator::parse("   "),
            Err(ResolverError::InvalidLocator(_))
        ));
    }

    #[test]
    fn test_add_request_carries_tag_and_hints() {
        let submission = AddSubmission::new(
            SourceLocator::parse("https://x/y.torrent").unwrap(),
            DestinationHints {
                destination_path: Some("/downloads/movies".to_string()),
                category_label: Some("movies".to_string()),
            },
            "haul-abc",
            Utc::now(),
        );
        let request = submission.to_add_request();
        assert_eq!(request.source, "https://x/y.torrent");
        assert_eq!(request.tags, vec!["haul-abc".to_string()]);
        assert_eq!(request.download_path.as_deref(), Some("/downloads/movies"));
        assert_eq!(request.category.as_deref(), Some("movies"));
    }
}
