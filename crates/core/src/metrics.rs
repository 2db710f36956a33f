//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Network executor requests
//! - Aggregated searches
//! - Book downloads
//! - Bookstore session requests
//!
//! The library never registers them; hosts add [`all_metrics`] to their own
//! registry.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Network
// =============================================================================

/// HTTP requests by outcome.
pub static NETWORK_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfnet_network_requests_total", "Total catalog HTTP requests"),
        &["status"], // "success", "error"
    )
    .unwrap()
});

/// HTTP request duration in seconds.
pub static NETWORK_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "shelfnet_network_request_duration_seconds",
            "Duration of catalog HTTP requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Search
// =============================================================================

/// Aggregated searches by kind and result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfnet_searches_total", "Total aggregated searches"),
        &["kind", "result"], // "simple"/"advanced", "success"/"error"
    )
    .unwrap()
});

/// Network rounds per search.
pub static SEARCH_ROUNDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("shelfnet_search_rounds", "Network rounds per aggregated search")
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 10.0, 20.0]),
        &["kind"],
    )
    .unwrap()
});

/// Books found per search.
pub static SEARCH_RESULTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("shelfnet_search_results", "Books found per aggregated search")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
    )
    .unwrap()
});

// =============================================================================
// Downloads
// =============================================================================

/// Book downloads by result.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfnet_downloads_total", "Total book download requests"),
        &["result"], // "cached", "success", "failed"
    )
    .unwrap()
});

/// Transfer duration of successful downloads in seconds.
pub static DOWNLOAD_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "shelfnet_download_duration_seconds",
            "Duration of book transfers",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

// =============================================================================
// Bookstore session
// =============================================================================

/// Session protocol requests by operation and outcome.
pub static SESSION_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfnet_session_requests_total", "Total bookstore session requests"),
        &["operation", "status"],
    )
    .unwrap()
});

/// All metrics for registration with a prometheus registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Network
        Box::new(NETWORK_REQUESTS.clone()),
        Box::new(NETWORK_REQUEST_DURATION.clone()),
        // Search
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_ROUNDS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        // Downloads
        Box::new(DOWNLOADS_TOTAL.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        // Session
        Box::new(SESSION_REQUESTS.clone()),
    ]
}
