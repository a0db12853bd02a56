//! Prometheus metrics for the agent.
//!
//! - HTTP request metrics (latency, counts, in flight)
//! - Pipeline gauges (collected when `/metrics` is scraped)
//! - Everything `haul_core::metrics` registers

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "haul_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("haul_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "haul_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Gauges
// =============================================================================

pub static MONITOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "haul_monitor_running",
        "Whether the completion monitor loop is running (1 = running)",
    )
    .unwrap()
});

/// Registered actions still waiting for their download.
pub static PENDING_ACTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("haul_pending_actions", "Pending move actions").unwrap()
});

pub static ACTIVE_MOVES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("haul_active_moves", "Moves currently executing").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Pipeline
    registry
        .register(Box::new(MONITOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(PENDING_ACTIONS.clone()))
        .unwrap();
    registry.register(Box::new(ACTIVE_MOVES.clone())).unwrap();

    // Core metrics (resolver, monitor, executor, notifier)
    for metric in haul_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh the pipeline gauges from current application state.
pub async fn collect_dynamic_metrics(state: &AppState) {
    let pipeline = state.pipeline();
    let snapshot = pipeline.registry().snapshot().await;

    MONITOR_RUNNING.set(i64::from(pipeline.is_running()));
    PENDING_ACTIONS.set(snapshot.pending.len() as i64);
    ACTIVE_MOVES.set(snapshot.active.len() as i64);
}

/// Normalize a path for metric labels (replace download ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    match regex_lite::Regex::new(r"[0-9a-fA-F]{40}") {
        Ok(hash_regex) => hash_regex.replace_all(path, "{id}").into_owned(),
        Err(_) => path.to_string(),
    }
}
