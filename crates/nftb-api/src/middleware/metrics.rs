//! # HTTP Metrics
//!
//! Request counters and latency histograms recorded through the `metrics`
//! facade. Nothing is recorded unless a recorder is installed; the CLI
//! installs the Prometheus recorder and the router exposes its rendering at
//! `/metrics`.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Middleware that records request count, errors and latency per route.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Route template, not the raw path, to keep label cardinality bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let labels = [
        ("method", method),
        ("path", path),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!("nftb_http_requests_total", &labels).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!("nftb_http_errors_total", &labels).increment(1);
    }
    metrics::histogram!("nftb_http_request_duration_seconds", &labels[..2])
        .record(started.elapsed().as_secs_f64());

    response
}
