use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::metrics;
use crate::torrent_client::{AddStatus, TorrentClient, TorrentClientError};

use super::{
    AddSubmission, DestinationHints, MatchOutcome, Matcher, Resolution, ResolutionSource,
    ResolvedItem, ResolverError, SourceLocator,
};

/// Turns a submission into the id of the backend item it created.
///
/// The backend's add call does not return an id, so the resolver tags the
/// request and then polls the matcher chain until one of them finds the item
/// or the deadline for the locator kind passes.
pub struct IdentityResolver {
    client: Arc<dyn TorrentClient>,
    config: ResolverConfig,
}

impl IdentityResolver {
    pub fn new(client: Arc<dyn TorrentClient>, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    fn correlation_tag(&self) -> String {
        format!("{}{}", self.config.tag_prefix, Uuid::new_v4().simple())
    }

    /// Submit `locator` to the backend and wait for its id.
    pub async fn resolve(
        &self,
        locator: SourceLocator,
        hints: DestinationHints,
    ) -> Result<Resolution, ResolverError> {
        let started = Instant::now();
        let submission = AddSubmission::new(locator, hints, self.correlation_tag(), Utc::now());
        let kind = submission.source_locator.kind();

        debug!(
            locator = %submission.source_locator.as_str(),
            kind = kind.as_str(),
            tag = %submission.correlation_tag,
            "Submitting download"
        );

        let result = match self.client.add_torrent(submission.to_add_request()).await {
            Ok(AddStatus::Accepted) => self.poll(&submission, started).await,
            Ok(AddStatus::Rejected { reason }) => self.resolve_rejected(&submission, reason).await,
            Err(e) => Err(ResolverError::Client(e)),
        };

        let label = match &result {
            Ok(resolution) if resolution.source == ResolutionSource::Duplicate => "duplicate",
            Ok(_) => "resolved",
            Err(ResolverError::AddRejected { .. }) => "rejected",
            Err(ResolverError::ResolutionTimeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::SUBMISSIONS_TOTAL.with_label_values(&[label]).inc();

        if let Ok(resolution) = &result {
            metrics::RESOLVER_MATCHES
                .with_label_values(&[resolution.source.as_str()])
                .inc();
            metrics::RESOLUTION_DURATION
                .with_label_values(&[kind.as_str()])
                .observe(started.elapsed().as_secs_f64());
            info!(
                id = %resolution.item.id,
                name = %resolution.item.display_name,
                matched_by = resolution.source.as_str(),
                "Download identity resolved"
            );
        }

        result
    }

    /// The backend refused the add. A self-describing locator whose item
    /// already exists is an idempotent resubmission.
    async fn resolve_rejected(
        &self,
        submission: &AddSubmission,
        reason: String,
    ) -> Result<Resolution, ResolverError> {
        let Some(id) = submission.source_locator.derived_id() else {
            return Err(ResolverError::AddRejected { reason });
        };

        match self.client.get_torrent(id).await {
            Ok(existing) => {
                info!(id = %existing.hash, "Download already present, reusing it");
                Ok(Resolution {
                    item: ResolvedItem::from(&existing),
                    source: ResolutionSource::Duplicate,
                })
            }
            Err(TorrentClientError::TorrentNotFound(_)) => {
                Err(ResolverError::AddRejected { reason })
            }
            Err(e) => Err(ResolverError::Client(e)),
        }
    }

    async fn poll(
        &self,
        submission: &AddSubmission,
        started: Instant,
    ) -> Result<Resolution, ResolverError> {
        let (interval, deadline) = self
            .config
            .timing_for(submission.source_locator.kind());
        let deadline_at = started + deadline;
        let mut chain: Vec<Matcher> = Matcher::CHAIN.to_vec();

        loop {
            let mut remaining = Vec::with_capacity(chain.len());
            for matcher in chain {
                match matcher
                    .probe(self.client.as_ref(), submission, &self.config)
                    .await
                {
                    MatchOutcome::Found(item) => {
                        return Ok(Resolution {
                            item: ResolvedItem::from(&item),
                            source: ResolutionSource::Matched(matcher),
                        });
                    }
                    MatchOutcome::KeepPolling => remaining.push(matcher),
                    MatchOutcome::NotFound => {
                        debug!(matcher = matcher.as_str(), "Matcher dropped from chain");
                    }
                }
            }
            chain = remaining;

            let now = Instant::now();
            if chain.is_empty() || now >= deadline_at {
                break;
            }
            sleep(interval.min(deadline_at - now)).await;
        }

        let waited_ms = started.elapsed().as_millis() as u64;
        warn!(
            tag = %submission.correlation_tag,
            locator = %submission.source_locator.as_str(),
            waited_ms,
            "Download did not appear before the deadline"
        );
        Err(ResolverError::ResolutionTimeout { waited_ms })
    }
}
