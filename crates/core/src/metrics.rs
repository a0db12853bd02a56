//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Identity resolution (submissions, matcher hits)
//! - Completion monitor (scans, purges)
//! - Action executor (moves, cleanup failures)
//! - Outcome notifier (webhook deliveries)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Resolver Metrics
// =============================================================================

/// Submissions total by result.
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("haul_submissions_total", "Total download submissions"),
        &["result"], // "resolved", "duplicate", "rejected", "timeout", "error"
    )
    .unwrap()
});

/// Resolver matches total by matcher.
pub static RESOLVER_MATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "haul_resolver_matches_total",
            "Total identities resolved, by the matcher that found them",
        ),
        &["matcher"], // "tag_filter", "direct_lookup", "recent_window", "duplicate"
    )
    .unwrap()
});

/// Time spent resolving an identity.
pub static RESOLUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "haul_resolution_duration_seconds",
            "Duration from submission to resolved identity",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["kind"], // "self_describing", "remote_fetch"
    )
    .unwrap()
});

// =============================================================================
// Monitor Metrics
// =============================================================================

/// Scan duration in seconds.
pub static SCAN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("haul_scan_duration_seconds", "Duration of monitor scans")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0, 3600.0]),
    )
    .unwrap()
});

/// Scans skipped because the previous one was still running.
pub static SCANS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "haul_scans_skipped_total",
        "Total scans skipped while a previous scan was in progress",
    )
    .unwrap()
});

/// Pending actions purged after exceeding their TTL.
pub static PENDING_PURGED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "haul_pending_purged_total",
        "Total pending actions purged as stale",
    )
    .unwrap()
});

// =============================================================================
// Executor Metrics
// =============================================================================

/// Moves total by result.
pub static MOVES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("haul_moves_total", "Total move attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Move duration in seconds.
pub static MOVE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("haul_move_duration_seconds", "Duration of move attempts").buckets(
            vec![1.0, 5.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0],
        ),
        &["result"],
    )
    .unwrap()
});

/// Source cleanup failures after a successful move.
pub static CLEANUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "haul_cleanup_failures_total",
        "Total source removals that failed after a successful move",
    )
    .unwrap()
});

// =============================================================================
// Notifier Metrics
// =============================================================================

/// Notifications total by result.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("haul_notifications_total", "Total outcome notifications"),
        &["result"], // "delivered", "rejected", "failed", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Resolver
        Box::new(SUBMISSIONS_TOTAL.clone()),
        Box::new(RESOLVER_MATCHES.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
        // Monitor
        Box::new(SCAN_DURATION.clone()),
        Box::new(SCANS_SKIPPED.clone()),
        Box::new(PENDING_PURGED.clone()),
        // Executor
        Box::new(MOVES_TOTAL.clone()),
        Box::new(MOVE_DURATION.clone()),
        Box::new(CLEANUP_FAILURES.clone()),
        // Notifier
        Box::new(NOTIFICATIONS_TOTAL.clone()),
    ]
}
