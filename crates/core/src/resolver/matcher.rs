//! Matchers used to find the item a submission turned into.

use chrono::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentFilters, TorrentInfo};

use super::AddSubmission;

/// Result of probing the backend with one matcher.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Found(TorrentInfo),
    /// Nothing yet; try again next tick.
    KeepPolling,
    /// This matcher cannot work for the submission; drop it from the chain.
    NotFound,
}

/// Strategies for locating a submitted item, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Query filtered by the correlation tag.
    TagFilter,
    /// Fetch the id read off a self-describing locator.
    DirectLookup,
    /// Scan the most recently added items.
    RecentWindow,
}

impl Matcher {
    /// The matcher chain, evaluated in this order every poll tick.
    pub const CHAIN: [Matcher; 3] = [
        Matcher::TagFilter,
        Matcher::DirectLookup,
        Matcher::RecentWindow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Matcher::TagFilter => "tag_filter",
            Matcher::DirectLookup => "direct_lookup",
            Matcher::RecentWindow => "recent_window",
        }
    }

    /// Probe the backend once.
    ///
    /// Client errors are transient here: the matcher keeps polling until the
    /// resolver deadline.
    pub async fn probe(
        &self,
        client: &dyn TorrentClient,
        submission: &AddSubmission,
        config: &ResolverConfig,
    ) -> MatchOutcome {
        let result = match self {
            Matcher::TagFilter => probe_tag_filter(client, submission, config).await,
            Matcher::DirectLookup => probe_direct_lookup(client, submission).await,
            Matcher::RecentWindow => probe_recent_window(client, submission, config).await,
        };

        result.unwrap_or_else(|e| {
            warn!(
                matcher = self.as_str(),
                tag = %submission.correlation_tag,
                error = %e,
                "Resolver probe failed, will retry"
            );
            MatchOutcome::KeepPolling
        })
    }
}

async fn probe_tag_filter(
    client: &dyn TorrentClient,
    submission: &AddSubmission,
    config: &ResolverConfig,
) -> Result<MatchOutcome, TorrentClientError> {
    let tag = &submission.correlation_tag;
    let items = client.list_torrents(&TorrentFilters::tagged(tag)).await?;

    if let Some(item) = items.iter().find(|t| t.has_tag(tag)) {
        return Ok(MatchOutcome::Found(item.clone()));
    }
    if items.is_empty() {
        return Ok(MatchOutcome::KeepPolling);
    }
    // Backends without tag support return untagged results; a lone one is
    // only taken when it is identifiable as this submission
    if items.len() <= config.tag_trust_limit && items.iter().all(|t| t.tags.is_empty()) {
        if let Some(item) = items.iter().find(|t| identifies(t, submission, config)) {
            return Ok(MatchOutcome::Found(item.clone()));
        }
    }

    debug!(
        tag = %tag,
        results = items.len(),
        "Backend ignored the tag filter"
    );
    Ok(MatchOutcome::NotFound)
}

async fn probe_direct_lookup(
    client: &dyn TorrentClient,
    submission: &AddSubmission,
) -> Result<MatchOutcome, TorrentClientError> {
    let Some(id) = submission.source_locator.derived_id() else {
        return Ok(MatchOutcome::NotFound);
    };

    match client.get_torrent(id).await {
        Ok(item) => Ok(MatchOutcome::Found(item)),
        Err(TorrentClientError::TorrentNotFound(_)) => Ok(MatchOutcome::KeepPolling),
        Err(e) => Err(e),
    }
}

async fn probe_recent_window(
    client: &dyn TorrentClient,
    submission: &AddSubmission,
    config: &ResolverConfig,
) -> Result<MatchOutcome, TorrentClientError> {
    let items = client
        .list_torrents(&TorrentFilters::recent(config.recent_window))
        .await?;

    Ok(match select_from_window(&items, submission, config) {
        Some(item) => MatchOutcome::Found(item.clone()),
        None => MatchOutcome::KeepPolling,
    })
}

/// Pick the submitted item out of a recently-added window.
///
/// Priority: correlation tag, then derived id, then proximity. A proximity
/// match was added no earlier than the recency margin before submission,
/// carries no other submission's correlation tag, and agrees with the
/// destination hints; at least one hint must be supplied. The newest one wins.
pub fn select_from_window<'a>(
    items: &'a [TorrentInfo],
    submission: &AddSubmission,
    config: &ResolverConfig,
) -> Option<&'a TorrentInfo> {
    if let Some(item) = items
        .iter()
        .find(|t| t.has_tag(&submission.correlation_tag))
    {
        return Some(item);
    }

    if let Some(id) = submission.source_locator.derived_id() {
        if let Some(item) = items.iter().find(|t| t.hash.eq_ignore_ascii_case(id)) {
            return Some(item);
        }
    }

    items
        .iter()
        .filter(|t| is_proximate(t, submission, config))
        .max_by_key(|t| t.added_at)
}

/// Whether an untagged item can only be this submission's.
fn identifies(
    item: &TorrentInfo,
    submission: &AddSubmission,
    config: &ResolverConfig,
) -> bool {
    match submission.source_locator.derived_id() {
        Some(id) => item.hash.eq_ignore_ascii_case(id),
        None => is_proximate(item, submission, config),
    }
}

fn is_proximate(
    item: &TorrentInfo,
    submission: &AddSubmission,
    config: &ResolverConfig,
) -> bool {
    let earliest = submission.submitted_at - Duration::seconds(config.recency_margin_secs);
    item.added_at.is_some_and(|added| added >= earliest)
        && !has_foreign_tag(item, submission, &config.tag_prefix)
        && has_hints(submission)
        && hints_match(item, submission)
}

/// Tagged by another submission of this resolver.
fn has_foreign_tag(item: &TorrentInfo, submission: &AddSubmission, prefix: &str) -> bool {
    item.tags
        .iter()
        .any(|t| t.starts_with(prefix) && *t != submission.correlation_tag)
}

fn has_hints(submission: &AddSubmission) -> bool {
    submission.destination_path.is_some() || submission.category_label.is_some()
}

fn hints_match(item: &TorrentInfo, submission: &AddSubmission) -> bool {
    let path_ok = match &submission.destination_path {
        Some(expected) => item
            .save_path
            .as_deref()
            .is_some_and(|actual| same_path(actual, expected)),
        None => true,
    };
    let category_ok = match &submission.category_label {
        Some(expected) => item.category.as_deref() == Some(expected.as_str()),
        None => true,
    };
    path_ok && category_ok
}

fn same_path(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DestinationHints, SourceLocator};
    use crate::torrent_client::TorrentState;
    use chrono::{DateTime, Utc};

    fn item(hash: &str, added_at: DateTime<Utc>) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: format!("Item {}", hash),
            state: TorrentState::Downloading,
            progress: 0.0,
            size_bytes: 0,
            added_at: Some(added_at),
            completed_at: None,
            save_path: Some("/downloads".to_string()),
            content_path: None,
            category: None,
            tags: Vec::new(),
        }
    }

    fn submission(locator: &str, hints: DestinationHints, at: DateTime<Utc>) -> AddSubmission {
        AddSubmission::new(SourceLocator::parse(locator).unwrap(), hints, "haul-tag", at)
    }

    fn in_downloads() -> DestinationHints {
        DestinationHints {
            destination_path: Some("/downloads".to_string()),
            category_label: None,
        }
    }

    #[test]
    fn test_tagged_item_wins_over_newer_and_path_matches() {
        let now = Utc::now();
        let sub = submission(
            "https://x/a.torrent",
            DestinationHints {
                destination_path: Some("/downloads".to_string()),
                category_label: None,
            },
            now,
        );

        let newest = item("newest", now + Duration::seconds(2));
        let mut tagged = item("tagged", now - Duration::seconds(5));
        tagged.tags = vec!["haul-tag".to_string()];
        tagged.save_path = Some("/elsewhere".to_string());
        let items = vec![newest, tagged];

        let picked = select_from_window(&items, &sub, &ResolverConfig::default()).unwrap();
        assert_eq!(picked.hash, "tagged");
    }

    #[test]
    fn test_derived_id_wins_over_proximity() {
        let now = Utc::now();
        let hash = "abcdef0123456789abcdef0123456789abcdef01";
        let sub = submission(
            &format!("magnet:?xt=urn:btih:{}", hash),
            DestinationHints::default(),
            now,
        );
        let items = vec![
            item("other", now + Duration::seconds(1)),
            item(hash, now - Duration::days(3)),
        ];

        let picked = select_from_window(&items, &sub, &ResolverConfig::default()).unwrap();
        assert_eq!(picked.hash, hash);
    }

    #[test]
    fn test_newest_proximity_match_wins() {
        let now = Utc::now();
        let sub = submission("https://x/a.torrent", in_downloads(), now);
        let items = vec![
            item("older", now - Duration::seconds(10)),
            item("newer", now + Duration::seconds(1)),
            item("stale", now - Duration::seconds(120)),
        ];

        let picked = select_from_window(&items, &sub, &ResolverConfig::default()).unwrap();
        assert_eq!(picked.hash, "newer");
    }

    #[test]
    fn test_proximity_skips_item_of_other_submission() {
        let now = Utc::now();
        let sub = AddSubmission::new(
            SourceLocator::parse("https://x/a.torrent").unwrap(),
            DestinationHints::default(),
            "haul-mine",
            now,
        );
        let mut theirs = item("theirs", now + Duration::seconds(1));
        theirs.tags = vec!["haul-theirs".to_string()];
        let items = vec![theirs.clone()];

        assert!(select_from_window(&items, &sub, &ResolverConfig::default()).is_none());

        let sub = AddSubmission::new(
            SourceLocator::parse("https://x/a.torrent").unwrap(),
            in_downloads(),
            "haul-mine",
            now,
        );
        let mut labelled = item("labelled", now);
        labelled.tags = vec!["favourite".to_string()];
        let items = vec![theirs, labelled];

        let picked = select_from_window(&items, &sub, &ResolverConfig::default()).unwrap();
        assert_eq!(picked.hash, "labelled");
    }

    #[test]
    fn test_proximity_needs_a_hint() {
        let now = Utc::now();
        let sub = submission("https://x/a.torrent", DestinationHints::default(), now);
        let items = vec![item("neighbour", now + Duration::seconds(1))];

        assert!(select_from_window(&items, &sub, &ResolverConfig::default()).is_none());
    }

    #[test]
    fn test_proximity_requires_every_hint() {
        let now = Utc::now();
        let sub = submission(
            "https://x/a.torrent",
            DestinationHints {
                destination_path: Some("/downloads/".to_string()),
                category_label: Some("movies".to_string()),
            },
            now,
        );

        let mut wrong_category = item("wrong", now + Duration::seconds(2));
        wrong_category.category = Some("music".to_string());
        let mut right = item("right", now);
        right.category = Some("movies".to_string());
        let items = vec![wrong_category, right];

        let picked = select_from_window(&items, &sub, &ResolverConfig::default()).unwrap();
        assert_eq!(picked.hash, "right");
    }

    #[test]
    fn test_no_match_outside_margin() {
        let now = Utc::now();
        let sub = submission("https://x/a.torrent", in_downloads(), now);
        let items = vec![item("old", now - Duration::minutes(5))];

        assert!(select_from_window(&items, &sub, &ResolverConfig::default()).is_none());
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            Matcher::CHAIN,
            [Matcher::TagFilter, Matcher::DirectLookup, Matcher::RecentWindow]
        );
    }
}
