//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): requests by status and outcome
//! - `bridge_request_duration_seconds` (histogram): latency by outcome
//! - `bridge_rewrites_total` (counter): broker addresses substituted
//! - `bridge_upstream_errors_total` (counter): forwarding failures by kind
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(status: u16, outcome: &'static str, start_time: Instant) {
    counter!("bridge_requests_total", "status" => status.to_string(), "outcome" => outcome).increment(1);
    histogram!("bridge_request_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_rewrite() {
    counter!("bridge_rewrites_total").increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("bridge_upstream_errors_total", "kind" => kind).increment(1);
}
