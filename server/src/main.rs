use overlayhub_server::config::{Config, StoreBackend};
use overlayhub_server::overlay::{MemoryOverlayStore, MongoOverlayStore, OverlayStore};
use overlayhub_server::server::{build_app, install_prometheus_recorder};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ensure a directory exists, creating it if necessary
fn ensure_directory(path: &Path, name: &str) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created {} directory: {:?}", name, path);
        Ok(())
    } else if path.is_dir() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} path {:?} exists but is not a directory", name, path),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    install_prometheus_recorder()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "overlayhub=debug,overlayhub_server=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {:?}", path);
    }

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );
    info!("Upload URLs will use base {}", config.base_url());

    // Uploads directory must be writable; HLS is produced externally so only warn
    let uploads_dir = &config.media.uploads_dir;
    ensure_directory(uploads_dir, "uploads")?;
    info!("Storing uploads in {:?}", uploads_dir);

    let hls_dir = &config.media.hls_dir;
    if hls_dir.is_dir() {
        info!("Serving HLS assets from {:?}", hls_dir);
    } else {
        warn!(
            "HLS directory {:?} does not exist yet - /hls requests will return 404 until the transcoder creates it",
            hls_dir
        );
    }

    // Initialize overlay store based on configuration
    let store: Arc<dyn OverlayStore> = match config.store.backend {
        StoreBackend::Mongo => Arc::new(MongoOverlayStore::connect(&config.store).await?),
        StoreBackend::Memory => {
            warn!("Using in-memory overlay store - overlays are lost on restart");
            Arc::new(MemoryOverlayStore::new())
        }
    };

    if let Err(e) = store.ping().await {
        warn!(
            "Overlay store ({}) is not reachable yet: {}",
            store.backend_name(),
            e
        );
    }

    let app = build_app(&config, store);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("OverlayHub server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
