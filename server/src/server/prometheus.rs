//! Prometheus metrics endpoint

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Must run before any metric is
/// recorded; without it the endpoint renders an empty body.
pub fn install_prometheus_recorder() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    PROMETHEUS_HANDLE.set(handle).ok();
    Ok(())
}

/// GET /metrics/prometheus
pub async fn prometheus_metrics() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}
