//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): outbound requests by method
//! - `guard_retries_total` (counter): retry attempts by method, status
//! - `guard_retries_exhausted_total` (counter): requests that ran out of attempts
//! - `guard_errors_total` (counter): classified errors by severity, kind
//! - `guard_backend_online` (gauge): 1=online, 0=offline
//! - `guard_error_queue_depth` (gauge): queued error records
//! - `guard_health_probe_seconds` (histogram): health probe latency
//!
//! # Design Decisions
//! - Recording functions are free functions so call sites stay one line
//! - Without `init_metrics` every call is a no-op

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str) {
    metrics::counter!("guard_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_retry(method: &str, status: u16) {
    metrics::counter!(
        "guard_retries_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_retries_exhausted(method: &str) {
    metrics::counter!("guard_retries_exhausted_total", "method" => method.to_string()).increment(1);
}

pub fn record_error(severity: &str, kind: &str) {
    metrics::counter!(
        "guard_errors_total",
        "severity" => severity.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("guard_error_queue_depth").set(depth as f64);
}

pub fn record_backend_online(online: bool) {
    metrics::gauge!("guard_backend_online").set(if online { 1.0 } else { 0.0 });
}

pub fn record_health_probe(elapsed: Duration) {
    metrics::histogram!("guard_health_probe_seconds").record(elapsed.as_secs_f64());
}
