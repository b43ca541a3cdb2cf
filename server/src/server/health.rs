//! Health endpoint

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Overlay store backend name
    pub store: String,
    /// "ready" or "unavailable"
    pub store_status: String,
    pub uptime_seconds: u64,
}

/// GET /health - Report whether the overlay store is reachable
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ready = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Overlay store health check failed: {}", e);
            false
        }
    };

    let (http_status, status, store_status) = if store_ready {
        (StatusCode::OK, "healthy", "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: state.store.backend_name().to_string(),
            store_status: store_status.to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }),
    )
}
