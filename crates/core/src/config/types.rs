use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::LocatorKind;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub qbittorrent: QBittorrentConfig,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

/// qBittorrent Web API connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:18080")
    #[serde(default = "default_qb_url")]
    pub url: String,
    #[serde(default = "default_qb_username")]
    pub username: String,
    #[serde(default = "default_qb_password")]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_qb_timeout")]
    pub timeout_secs: u32,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            url: default_qb_url(),
            username: default_qb_username(),
            password: default_qb_password(),
            timeout_secs: default_qb_timeout(),
        }
    }
}

fn default_qb_url() -> String {
    "http://localhost:18080".to_string()
}

fn default_qb_username() -> String {
    "admin".to_string()
}

fn default_qb_password() -> String {
    "adminadmin".to_string()
}

fn default_qb_timeout() -> u32 {
    30
}

/// rclone invocation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoverConfig {
    /// Path to the rclone binary
    #[serde(default = "default_rclone_path")]
    pub rclone_path: String,
    /// rclone config file; rclone's own default is used when unset
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    /// Extra arguments appended to every `rclone move`
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            rclone_path: default_rclone_path(),
            config_path: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_rclone_path() -> String {
    "rclone".to_string()
}

/// Completion monitor and executor timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// How often pending items are checked (milliseconds).
    #[serde(default = "default_scan_interval")]
    pub scan_interval_ms: u64,

    /// Upper bound for a single move attempt (seconds).
    #[serde(default = "default_move_timeout")]
    pub move_timeout_secs: u64,

    /// Pending actions older than this are purged without executing (seconds).
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
}

fn default_scan_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_move_timeout() -> u64 {
    3600 // 1 hour
}

fn default_pending_ttl() -> u64 {
    24 * 60 * 60 // 24 hours
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval(),
            move_timeout_secs: default_move_timeout(),
            pending_ttl_secs: default_pending_ttl(),
        }
    }
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_secs(self.move_timeout_secs)
    }

    pub fn pending_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pending_ttl_secs as i64)
    }
}

/// Identity resolver polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Poll interval for magnet links (milliseconds).
    #[serde(default = "default_magnet_poll_interval")]
    pub magnet_poll_interval_ms: u64,

    /// Give up resolving a magnet link after this long (milliseconds).
    #[serde(default = "default_magnet_deadline")]
    pub magnet_deadline_ms: u64,

    /// Poll interval for remote .torrent links (milliseconds).
    #[serde(default = "default_remote_poll_interval")]
    pub remote_poll_interval_ms: u64,

    /// Remote links are fetched by the backend first, so they get longer.
    #[serde(default = "default_remote_deadline")]
    pub remote_deadline_ms: u64,

    /// Size of the most-recently-added window used by the fallback scan.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// How far before submission an item may have been added and still
    /// count as a proximity match (seconds).
    #[serde(default = "default_recency_margin")]
    pub recency_margin_secs: i64,

    /// A tag-filtered result without an exact tag match is trusted only
    /// when it has at most this many items.
    #[serde(default = "default_tag_trust_limit")]
    pub tag_trust_limit: usize,

    /// Prefix for generated correlation tags.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
}

fn default_magnet_poll_interval() -> u64 {
    500
}

fn default_magnet_deadline() -> u64 {
    10_000
}

fn default_remote_poll_interval() -> u64 {
    2000
}

fn default_remote_deadline() -> u64 {
    60_000
}

fn default_recent_window() -> usize {
    10
}

fn default_recency_margin() -> i64 {
    30
}

fn default_tag_trust_limit() -> usize {
    1
}

fn default_tag_prefix() -> String {
    "haul-".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            magnet_poll_interval_ms: default_magnet_poll_interval(),
            magnet_deadline_ms: default_magnet_deadline(),
            remote_poll_interval_ms: default_remote_poll_interval(),
            remote_deadline_ms: default_remote_deadline(),
            recent_window: default_recent_window(),
            recency_margin_secs: default_recency_margin(),
            tag_trust_limit: default_tag_trust_limit(),
            tag_prefix: default_tag_prefix(),
        }
    }
}

impl ResolverConfig {
    /// Poll interval and deadline for the given locator kind.
    pub fn timing_for(&self, kind: LocatorKind) -> (Duration, Duration) {
        match kind {
            LocatorKind::SelfDescribing => (
                Duration::from_millis(self.magnet_poll_interval_ms),
                Duration::from_millis(self.magnet_deadline_ms),
            ),
            LocatorKind::RemoteFetch => (
                Duration::from_millis(self.remote_poll_interval_ms),
                Duration::from_millis(self.remote_deadline_ms),
            ),
        }
    }
}

/// Outcome webhook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Webhook URL; notifications are skipped when unset
    #[serde(default)]
    pub url: Option<String>,
    /// Shared secret sent with every webhook request
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default = "default_notify_timeout")]
    pub timeout_ms: u64,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

fn default_notify_timeout() -> u64 {
    5000
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_key_header: default_api_key_header(),
            timeout_ms: default_notify_timeout(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub qbittorrent: SanitizedQBittorrentConfig,
    pub mover: MoverConfig,
    pub monitor: MonitorConfig,
    pub resolver: ResolverConfig,
    pub notifier: SanitizedNotifierConfig,
}

/// qBittorrent config with the password hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

/// Notifier config with the shared secret hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub api_key_configured: bool,
    pub timeout_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            qbittorrent: SanitizedQBittorrentConfig {
                url: config.qbittorrent.url.clone(),
                username: config.qbittorrent.username.clone(),
                password_configured: !config.qbittorrent.password.is_empty(),
                timeout_secs: config.qbittorrent.timeout_secs,
            },
            mover: config.mover.clone(),
            monitor: config.monitor.clone(),
            resolver: config.resolver.clone(),
            notifier: SanitizedNotifierConfig {
                url: config.notifier.url.clone(),
                api_key_configured: config
                    .notifier
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_ms: config.notifier.timeout_ms,
            },
        }
    }
}
