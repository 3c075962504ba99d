//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_rate_limited_total` (counter): requests denied by the rate limiter
//! - `shield_cors_rejected_total` (counter): requests from disallowed origins
//! - `shield_auth_denied_total` (counter): auth denials by kind
//! - `shield_rate_limit_clients` (gauge): entries held by the rate-limit store
//!
//! Updates are no-ops until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_rate_limited() {
    counter!("shield_rate_limited_total").increment(1);
}

pub fn record_cors_rejected() {
    counter!("shield_cors_rejected_total").increment(1);
}

pub fn record_auth_denied(kind: &'static str) {
    counter!("shield_auth_denied_total", "kind" => kind).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("shield_rate_limit_clients").set(count as f64);
}
