//! Prometheus metrics for portal-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// GraphQL operation counter by operation and status.
pub static GRAPHQL_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "portal_graphql_requests_total",
        "Total number of GraphQL operations",
        &["operation", "status"]
    )
    .expect("Failed to register graphql_requests_total")
});

/// Database query duration histogram by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "portal_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register db_query_duration")
});

/// Authentication attempt counter (no per-user labels).
pub static AUTH_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "portal_auth_attempts_total",
        "Total number of login/register attempts",
        &["operation", "outcome"]
    )
    .expect("Failed to register auth_attempts_total")
});

/// Render all registered metrics in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
