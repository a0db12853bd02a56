//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (backing torrent client, mover, notifier), so the whole pipeline can be
//! exercised without qBittorrent, rclone or a webhook receiver.
//!
//! # Example
//!
//! ```rust,ignore
//! use haul_core::testing::{MockMover, MockNotifier, MockTorrentClient};
//!
//! let client = Arc::new(MockTorrentClient::new());
//! let mover = Arc::new(MockMover::new());
//! let notifier = Arc::new(MockNotifier::new());
//!
//! let pipeline = DownloadPipeline::new(monitor, resolver, client.clone(), mover, notifier);
//! ```

mod mock_mover;
mod mock_notifier;
mod mock_torrent_client;

pub use mock_mover::MockMover;
pub use mock_notifier::MockNotifier;
pub use mock_torrent_client::{MockTorrentClient, RecordedAddTorrent};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{MonitorConfig, ResolverConfig};

    /// Magnet URI for a 40-hex info hash.
    pub fn magnet(hash: &str) -> String {
        format!("magnet:?xt=urn:btih:{}", hash)
    }

    /// Monitor settings with a short scan interval.
    pub fn fast_monitor_config() -> MonitorConfig {
        MonitorConfig {
            scan_interval_ms: 1000,
            ..Default::default()
        }
    }

    /// Resolver settings with short deadlines.
    pub fn fast_resolver_config() -> ResolverConfig {
        ResolverConfig {
            magnet_poll_interval_ms: 10,
            magnet_deadline_ms: 100,
            remote_poll_interval_ms: 10,
            remote_deadline_ms: 200,
            ..Default::default()
        }
    }
}
