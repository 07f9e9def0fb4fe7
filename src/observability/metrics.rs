//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, status
//! - `api_request_duration_seconds` (histogram): server-side latency by method
//! - `api_rate_limited_total` (counter): admission rejections
//! - `api_faults_injected_total` (counter): injected faults by kind
//! - `api_idempotency_total` (counter): idempotent calls by outcome (fresh, replayed)
//! - `client_retries_total` (counter): client retries by reason
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing unless they call [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record a completed server request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

pub fn record_fault_injected(kind: &'static str) {
    counter!("api_faults_injected_total", "kind" => kind).increment(1);
}

pub fn record_idempotency(outcome: &'static str) {
    counter!("api_idempotency_total", "outcome" => outcome).increment(1);
}

pub fn record_client_retry(reason: &'static str) {
    counter!("client_retries_total", "reason" => reason).increment(1);
}

/// Middleware recording method, status and latency of every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}
