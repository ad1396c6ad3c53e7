//! Self-instrumentation metrics.
//!
//! # Metrics
//! - `hvac_proxy_requests_total` (counter): relayed requests by method, status
//! - `hvac_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `hvac_proxy_captures_total` (counter): captured bodies by direction, format
//! - `hvac_proxy_extractions_total` (counter): telemetry extraction outcomes
//! - `hvac_proxy_capture_write_failures_total` (counter): failed artifact writes
//! - `hvac_proxy_publish_total` (counter): MQTT publish outcomes
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "hvac_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("hvac_proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_capture(direction: &'static str, markup: bool) {
    let format = if markup { "xml" } else { "raw" };
    counter!("hvac_proxy_captures_total", "direction" => direction, "format" => format).increment(1);
}

pub fn record_extraction(outcome: &'static str) {
    counter!("hvac_proxy_extractions_total", "outcome" => outcome).increment(1);
}

pub fn record_write_failure() {
    counter!("hvac_proxy_capture_write_failures_total").increment(1);
}

pub fn record_publish(outcome: &'static str) {
    counter!("hvac_proxy_publish_total", "outcome" => outcome).increment(1);
}
