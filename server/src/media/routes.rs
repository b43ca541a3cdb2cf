//! HTTP routes for uploads and static media
//!
//! - `POST /api/upload` stores a multipart `file` part under the upload root
//! - `GET /uploads/{filename}` serves uploaded files
//! - `GET /hls/{path...}` serves playlists and segments written by the
//!   external transcoder

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::MediaConfig;

use super::types::{MediaError, UploadResponse};
use super::uploads::{UploadDir, upload_url};

/// Application state for the upload endpoint
#[derive(Clone)]
pub struct MediaAppState {
    pub uploads: Arc<UploadDir>,
    /// Base URL upload links are built from
    pub base_url: String,
}

/// Error response for media API
#[derive(Debug, Serialize)]
pub struct MediaErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<MediaError> for MediaErrorResponse {
    fn from(e: MediaError) -> Self {
        let code = match &e {
            MediaError::MissingFile => "missing_file",
            MediaError::InvalidFilename(_) => "invalid_filename",
            MediaError::Multipart(_) => "invalid_multipart",
            MediaError::TooLarge => "too_large",
            MediaError::IoError(_) => "io_error",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for MediaErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "missing_file" | "invalid_filename" | "invalid_multipart" => StatusCode::BAD_REQUEST,
            "too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn multipart_error(e: MultipartError) -> MediaError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MediaError::TooLarge
    } else {
        MediaError::Multipart(e.body_text())
    }
}

/// POST /api/upload - Store the multipart `file` part under its own filename
pub async fn upload_file(
    State(state): State<MediaAppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, MediaErrorResponse> {
    // A request that is not multipart at all has no file part either
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Upload without multipart body: {}", rejection.body_text());
        MediaErrorResponse::from(MediaError::MissingFile)
    })?;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart upload: {}", e);
        MediaErrorResponse::from(multipart_error(e))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        // Browsers send an empty filename when no file was picked
        let Some(filename) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string)
        else {
            continue;
        };

        let mut pending = state.uploads.begin(&filename).await.map_err(|e| {
            tracing::warn!("Rejected upload {:?}: {}", filename, e);
            MediaErrorResponse::from(e)
        })?;

        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = pending.write_chunk(&chunk).await {
                        tracing::error!("Failed to write upload {:?}: {}", filename, e);
                        pending.abort();
                        return Err(MediaErrorResponse::from(e));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Upload {:?} interrupted: {}", filename, e);
                    pending.abort();
                    return Err(MediaErrorResponse::from(multipart_error(e)));
                }
            }
        }

        let size = pending.written();
        pending.commit().await.map_err(|e| {
            tracing::error!("Failed to store upload {:?}: {}", filename, e);
            MediaErrorResponse::from(e)
        })?;

        counter!("overlayhub_uploads_total").increment(1);
        histogram!("overlayhub_upload_bytes").record(size as f64);
        tracing::info!("Stored upload {:?} ({} bytes)", filename, size);

        return Ok(Json(UploadResponse {
            url: upload_url(&state.base_url, &filename),
        }));
    }

    tracing::debug!("Upload request had no file part");
    Err(MediaErrorResponse::from(MediaError::MissingFile))
}

/// Refuse paths with a dot-prefixed segment, which covers uploads that are
/// still being written.
async fn hide_partial_uploads(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        urlencoding::decode(segment).is_ok_and(|decoded| decoded.starts_with('.'))
    });
    if hidden {
        tracing::debug!("Refusing hidden upload path {}", request.uri().path());
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Build upload and static media routes
pub fn media_routes(state: MediaAppState, config: &MediaConfig) -> Router {
    let body_limit = match config.max_upload_size {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    // Live playlists are rewritten in place by the transcoder
    let hls_service = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .service(ServeDir::new(&config.hls_dir));

    let uploads = Router::new()
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .layer(middleware::from_fn(hide_partial_uploads));

    Router::new()
        .route("/api/upload", post(upload_file).layer(body_limit))
        .with_state(state)
        .merge(uploads)
        .nest_service("/hls", hls_service)
}
