//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog provider requests
//! - Page aggregation and its cache
//! - Search index builds
//! - Favourites mutations and hydration

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Catalog
// =============================================================================

/// Catalog provider requests by endpoint and result.
pub static CATALOG_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmdeck_catalog_requests_total",
            "Total catalog provider requests",
        ),
        &["endpoint", "result"], // endpoint: "listing", "detail", "genres"
    )
    .unwrap()
});

/// Catalog provider request duration in seconds.
pub static CATALOG_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "filmdeck_catalog_request_duration_seconds",
            "Duration of catalog provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

// =============================================================================
// Aggregator
// =============================================================================

/// Aggregator cache lookups by outcome.
pub static AGGREGATOR_CACHE: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmdeck_aggregator_cache_total",
            "Aggregator cache lookups and evictions",
        ),
        &["outcome"], // "fresh", "stale", "miss", "evicted"
    )
    .unwrap()
});

/// Background refreshes by result.
pub static AGGREGATOR_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmdeck_aggregator_refreshes_total",
            "Background stale-while-revalidate refreshes",
        ),
        &["result"],
    )
    .unwrap()
});

/// Aggregated collection sizes.
pub static AGGREGATED_ITEMS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "filmdeck_aggregated_items",
            "Number of unique items per aggregated collection",
        )
        .buckets(vec![0.0, 20.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]),
        &["media_type"],
    )
    .unwrap()
});

// =============================================================================
// Search index
// =============================================================================

/// Items left out of a search index because they had no title.
pub static INDEX_SKIPPED_ITEMS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filmdeck_index_skipped_items_total",
        "Items skipped while building the search index",
    )
    .unwrap()
});

// =============================================================================
// Favourites
// =============================================================================

/// Favourites mutations by operation and terminal state.
pub static FAVOURITE_MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmdeck_favourite_mutations_total",
            "Favourites mutations by terminal state",
        ),
        &["operation", "state"],
    )
    .unwrap()
});

/// Favourites hydrations by result.
pub static FAVOURITE_HYDRATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmdeck_favourite_hydrations_total",
            "Favourites hydrations on identity change",
        ),
        &["result"],
    )
    .unwrap()
});

/// All core metrics, for registration in the server's registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CATALOG_REQUESTS.clone()),
        Box::new(CATALOG_REQUEST_DURATION.clone()),
        Box::new(AGGREGATOR_CACHE.clone()),
        Box::new(AGGREGATOR_REFRESHES.clone()),
        Box::new(AGGREGATED_ITEMS.clone()),
        Box::new(INDEX_SKIPPED_ITEMS.clone()),
        Box::new(FAVOURITE_MUTATIONS.clone()),
        Box::new(FAVOURITE_HYDRATIONS.clone()),
    ]
}
