pub mod config;
pub mod metrics;
pub mod mover;
pub mod notifier;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use mover::{MoveReport, MoveRequest, Mover, MoverError, RcloneMover};
pub use notifier::{Delivery, Notifier, NotifyError, OutcomeEvent, OutcomeKind, WebhookNotifier};
pub use pipeline::{
    ActionExecutor, CompletionMonitor, DownloadPipeline, ExecutionError, ExecutionOutcome,
    PipelineError, PipelineStatus, ScanReport, SubmitRequest, SubmitResult,
};
pub use registry::{MoveAction, PendingAction, PendingActionRegistry, RegisterOutcome};
pub use resolver::{
    IdentityResolver, LocatorKind, MatchOutcome, Matcher, ResolvedItem, ResolverError,
    SourceLocator,
};
pub use torrent_client::{
    AddStatus, AddTorrentRequest, QBittorrentClient, TorrentClient, TorrentClientError,
    TorrentFile, TorrentFilters, TorrentInfo, TorrentState,
};
