//! # Application State
//!
//! Shared state for the validator service: the validator itself, behind
//! [`ValidatorService`], and the Prometheus handle when metrics are exported.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use nftb_protocol::ValidatorService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<dyn ValidatorService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics endpoint.
    pub fn new(validator: Arc<dyn ValidatorService>) -> Self {
        Self {
            validator,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
