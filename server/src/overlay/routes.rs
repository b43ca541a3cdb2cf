//! HTTP route handlers for the overlay CRUD API

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::store::OverlayStore;
use super::types::{Overlay, OverlayError, OverlayPatch, parse_overlay_id};

/// Application state containing the overlay store
#[derive(Clone)]
pub struct OverlayAppState {
    pub store: Arc<dyn OverlayStore>,
}

/// Error response for overlay API
#[derive(Debug, Serialize)]
pub struct OverlayErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<OverlayError> for OverlayErrorResponse {
    fn from(e: OverlayError) -> Self {
        let code = match &e {
            OverlayError::InvalidId(_) => "invalid_id",
            OverlayError::InvalidField { .. } => "invalid_field",
            OverlayError::InvalidPayload(_) => "invalid_payload",
            OverlayError::NotFound(_) => "not_found",
            OverlayError::Storage(_) => "storage_error",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for OverlayErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_id" | "invalid_field" | "invalid_payload" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Response body for a successful delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
}

/// Log a failed store call at a level matching its severity
fn log_failure(op: &str, id: Option<&str>, e: &OverlayError) {
    let id = id.unwrap_or("-");
    match e {
        OverlayError::Storage(_) => tracing::error!("Failed to {} overlay {}: {}", op, id, e),
        _ => tracing::debug!("Rejected {} of overlay {}: {}", op, id, e),
    }
}

/// Turn a JSON body (or its rejection) into a coerced patch
fn parse_body(
    op: &str,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<OverlayPatch, OverlayErrorResponse> {
    let Json(fields) = body.map_err(|rejection| {
        tracing::debug!("Rejected {} body: {}", op, rejection.body_text());
        OverlayErrorResponse::from(OverlayError::InvalidPayload(rejection.body_text()))
    })?;

    OverlayPatch::from_json(fields).map_err(|e| {
        log_failure(op, None, &e);
        OverlayErrorResponse::from(e)
    })
}

/// POST /api/overlays - Create an overlay
pub async fn create_overlay(
    State(state): State<OverlayAppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<Overlay>), OverlayErrorResponse> {
    counter!("overlayhub_overlay_ops_total", "op" => "create").increment(1);
    let patch = parse_body("create", body)?;

    let overlay = state.store.create(patch).await.map_err(|e| {
        log_failure("create", None, &e);
        OverlayErrorResponse::from(e)
    })?;

    tracing::info!("Created overlay {}", overlay.id);
    Ok((StatusCode::CREATED, Json(overlay)))
}

/// GET /api/overlays - List all overlays
pub async fn list_overlays(
    State(state): State<OverlayAppState>,
) -> Result<Json<Vec<Overlay>>, OverlayErrorResponse> {
    counter!("overlayhub_overlay_ops_total", "op" => "list").increment(1);

    let overlays = state.store.list().await.map_err(|e| {
        log_failure("list", None, &e);
        OverlayErrorResponse::from(e)
    })?;

    tracing::debug!("Listing {} overlays", overlays.len());
    Ok(Json(overlays))
}

/// PUT /api/overlays/:id - Merge fields into an overlay
pub async fn update_overlay(
    State(state): State<OverlayAppState>,
    Path(id): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Overlay>, OverlayErrorResponse> {
    counter!("overlayhub_overlay_ops_total", "op" => "update").increment(1);

    let object_id = parse_overlay_id(&id).map_err(|e| {
        log_failure("update", Some(&id), &e);
        OverlayErrorResponse::from(e)
    })?;
    let patch = parse_body("update", body)?;

    let overlay = state.store.update(object_id, patch).await.map_err(|e| {
        log_failure("update", Some(&id), &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok(Json(overlay))
}

/// DELETE /api/overlays/:id - Delete an overlay
pub async fn delete_overlay(
    State(state): State<OverlayAppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, OverlayErrorResponse> {
    counter!("overlayhub_overlay_ops_total", "op" => "delete").increment(1);

    let object_id = parse_overlay_id(&id).map_err(|e| {
        log_failure("delete", Some(&id), &e);
        OverlayErrorResponse::from(e)
    })?;

    state.store.delete(object_id).await.map_err(|e| {
        log_failure("delete", Some(&id), &e);
        OverlayErrorResponse::from(e)
    })?;

    tracing::info!("Deleted overlay {}", id);
    Ok(Json(DeleteResponse { status: "deleted" }))
}

/// Build overlay API routes
pub fn overlay_routes(state: OverlayAppState) -> Router {
    Router::new()
        .route("/overlays", get(list_overlays).post(create_overlay))
        .route("/overlays/:id", put(update_overlay).delete(delete_overlay))
        .with_state(state)
}
