//! Application router

use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, StaticFilesConfig};
use crate::media::{MediaAppState, UploadDir, media_routes};
use crate::overlay::{OverlayAppState, OverlayStore, overlay_routes};

use super::health::health;
use super::prometheus::prometheus_metrics;

/// Shared state for server-level endpoints
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OverlayStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn OverlayStore>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }
}

/// Build the full HTTP application: overlay API, uploads, HLS assets,
/// health, metrics and the optional frontend, with tracing and permissive CORS.
pub fn build_app(config: &Config, store: Arc<dyn OverlayStore>) -> Router {
    let overlay_state = OverlayAppState {
        store: store.clone(),
    };
    let media_state = MediaAppState {
        uploads: Arc::new(UploadDir::new(config.media.uploads_dir.clone())),
        base_url: config.base_url(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .with_state(AppState::new(store))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .nest("/api", overlay_routes(overlay_state))
        .merge(media_routes(media_state, &config.media));

    with_static_files(app, &config.static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve a built frontend for every unmatched route, falling back to
/// `index.html` so client-side routing works. Returns `app` unchanged when
/// no directory is configured or it does not exist.
fn with_static_files(app: Router, config: &StaticFilesConfig) -> Router {
    let Some(ref static_dir) = config.dir else {
        info!("Static file serving disabled (STATIC_FILES_DIR not set)");
        return app;
    };

    if !static_dir.is_dir() {
        warn!(
            "Static files directory not found: {:?} - static file serving disabled",
            static_dir
        );
        return app;
    }

    info!("Serving static files from: {:?}", static_dir);

    let index_path = static_dir.join("index.html");
    let serve_dir = ServeDir::new(static_dir).fallback(ServeFile::new(&index_path));

    let static_service = ServiceBuilder::new()
        .layer(CompressionLayer::new())
        .service(serve_dir);

    app.fallback_service(static_service)
}
