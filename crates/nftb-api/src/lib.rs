//! # nftb-api: Validator HTTP Service
//!
//! Exposes a [`ValidatorService`](nftb_protocol::ValidatorService) over
//! HTTP with Axum/Tower/Tokio, and provides the matching
//! [`ValidatorHttpClient`] for token owners.
//!
//! ## Routes
//!
//! - `POST /v1/challenges`, `POST /v1/requests`, `POST /v1/secrets`:
//!   see [`routes::validator`]
//! - `/health/liveness`, `/health/readiness`: health checks
//! - `/metrics`: Prometheus text format, when a handle is configured
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsLayer
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; everything delegates to
//!   `nftb-protocol`.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod client;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use std::future::Future;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use client::ValidatorHttpClient;
pub use error::{AppError, ErrorBody, ErrorDetail};
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::validator::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics));

    Router::new().merge(ops).merge(api).with_state(state)
}

/// Serve `app(state)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "validator service listening");
    }
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check.
async fn readiness() -> &'static str {
    "ready"
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}
