use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use haul_agent::{api::create_router, state::AppState};
use haul_core::{
    load_config, validate_config, DownloadPipeline, Mover, Notifier, QBittorrentClient,
    RcloneMover, TorrentClient, WebhookNotifier,
};

/// Config file read when `HAUL_CONFIG` is unset
const DEFAULT_CONFIG_PATH: &str = "haul.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default one is optional
    let config_path = match std::env::var("HAUL_CONFIG") {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            path.exists().then_some(path)
        }
    };

    match &config_path {
        Some(path) => info!("Loading configuration from {:?}", path),
        None => info!("No config file, using defaults and environment"),
    }
    let config = load_config(config_path.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    info!("Initializing qBittorrent client at {}", config.qbittorrent.url);
    let client: Arc<dyn TorrentClient> = Arc::new(
        QBittorrentClient::new(config.qbittorrent.clone())
            .context("Failed to create qBittorrent client")?,
    );

    let rclone = RcloneMover::new(config.mover.clone());
    if let Err(e) = rclone.validate().await {
        // Moves fail individually until rclone is available
        error!("rclone check failed: {}", e);
    }
    let mover: Arc<dyn Mover> = Arc::new(rclone);

    let webhook = Arc::new(
        WebhookNotifier::new(&config.notifier).context("Failed to create webhook notifier")?,
    );
    if !webhook.is_configured().await {
        info!("No webhook URL configured, outcome notifications are skipped");
    }

    let pipeline = Arc::new(DownloadPipeline::new(
        config.monitor.clone(),
        config.resolver.clone(),
        client,
        mover,
        Arc::clone(&webhook) as Arc<dyn Notifier>,
    ));
    pipeline.start().await;
    info!("Download pipeline started");

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, Arc::clone(&pipeline), webhook));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let an in-progress scan finish before exiting
    info!("Server shutting down...");
    pipeline.stop().await;
    info!("Download pipeline stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
