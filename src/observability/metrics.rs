//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted connections
//! - `proxy_active_connections` (gauge): live connection handlers
//! - `proxy_connection_errors_total` (counter): failures by `kind`
//! - `proxy_relayed_bytes_total` (counter): bytes copied by `direction`
//! - `proxy_dedup_entries` (gauge): distinct payload digests recorded

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::proxy::relay::Direction;

/// Install the Prometheus exporter with an HTTP scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened(active: u64) {
    metrics::counter!("proxy_connections_total").increment(1);
    metrics::gauge!("proxy_active_connections").set(active as f64);
}

pub fn record_connection_closed(active: u64) {
    metrics::gauge!("proxy_active_connections").set(active as f64);
}

pub fn record_connection_error(kind: &'static str) {
    metrics::counter!("proxy_connection_errors_total", "kind" => kind).increment(1);
}

pub fn record_relayed_bytes(direction: Direction, bytes: usize) {
    metrics::counter!("proxy_relayed_bytes_total", "direction" => direction.as_str())
        .increment(bytes as u64);
}

pub fn record_dedup_entries(entries: usize) {
    metrics::gauge!("proxy_dedup_entries").set(entries as f64);
}
