//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): inbound requests by role, status
//! - `image_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `image_proxy_cache_lookups_total` (counter): hit, miss, stale, rejected, error
//! - `image_proxy_cache_writes_total` (counter): ok, error
//! - `image_proxy_upstream_attempts_total` (counter): response, transient, terminal
//! - `image_proxy_transforms_total` (counter): by role and whether a crop happened
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(role: &str, status: u16, start: Instant) {
    counter!(
        "image_proxy_requests_total",
        "role" => role.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("image_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(outcome: &'static str) {
    counter!("image_proxy_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_write(outcome: &'static str) {
    counter!("image_proxy_cache_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_attempt(outcome: &'static str) {
    counter!("image_proxy_upstream_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_transform(role: &str, cropped: bool) {
    counter!(
        "image_proxy_transforms_total",
        "role" => role.to_string(),
        "cropped" => if cropped { "true" } else { "false" }
    )
    .increment(1);
}
