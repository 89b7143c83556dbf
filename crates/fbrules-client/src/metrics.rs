//! Rules API metrics.
//!
//! Request counters by operation and status, and latency histograms.
//! The library only records; the host installs a recorder/exporter.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total rules API requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "rules_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "rules_latency_seconds";
}

/// Record metrics for a completed rules API request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("rules_"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_request("get_ruleset", 200, 12.5);
    }
}
