//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Shelfwise metrics
pub const METRICS_PREFIX: &str = "shelfwise";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.100, // 100ms
    0.250, // 250ms - P99 target
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Report metrics
    describe_counter!(
        format!("{}_report_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of report queries compiled and executed"
    );

    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Report query latency in seconds"
    );

    describe_gauge!(
        format!("{}_report_rows_returned", METRICS_PREFIX),
        Unit::Count,
        "Number of rows returned by the last report page"
    );

    // Mutation metrics
    describe_counter!(
        format!("{}_order_patches_total", METRICS_PREFIX),
        Unit::Count,
        "Total order patch operations"
    );

    // Tag codec metrics
    describe_counter!(
        format!("{}_malformed_tags_total", METRICS_PREFIX),
        Unit::Count,
        "Tag strings that failed to decode and were treated as empty"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record report-query metrics
pub fn record_report(duration_secs: f64, report: &str, rows: usize) {
    counter!(
        format!("{}_report_queries_total", METRICS_PREFIX),
        "report" => report.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        "report" => report.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_report_rows_returned", METRICS_PREFIX),
        "report" => report.to_string()
    )
    .set(rows as f64);
}

/// Helper to record a patch mutation
pub fn record_patch(kind: &str) {
    counter!(
        format!("{}_order_patches_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Helper to record a tag-decode failure
pub fn record_malformed_tags() {
    counter!(format!("{}_malformed_tags_total", METRICS_PREFIX)).increment(1);
}
