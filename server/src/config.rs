//! Server configuration
//!
//! Configuration is loaded from environment variables (optionally seeded from a
//! `.env` file by the binary). See `.env.example` for documentation.

use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL used when building upload URLs (optional)
    pub public_base_url: Option<String>,

    /// Overlay store configuration
    pub store: StoreConfig,

    /// Media (uploads + HLS) configuration
    pub media: MediaConfig,

    /// Static frontend configuration
    pub static_files: StaticFilesConfig,
}

/// Which overlay store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB collection
    Mongo,
    /// In-process store, contents are lost on restart
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Some(Self::Mongo),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Overlay store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// MongoDB connection URI
    pub mongo_uri: String,
    /// Database name
    pub db_name: String,
    /// Collection holding overlay documents
    pub collection: String,
}

/// Media-related configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory uploaded files are written to
    pub uploads_dir: PathBuf,
    /// Directory the external transcoder writes HLS playlists and segments to
    pub hls_dir: PathBuf,
    /// Maximum upload request size in bytes. `None` disables the limit.
    pub max_upload_size: Option<usize>,
}

/// Static frontend serving configuration
#[derive(Debug, Clone, Default)]
pub struct StaticFilesConfig {
    /// Directory containing the built frontend (optional)
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_base_url: None,
            store: StoreConfig::default(),
            media: MediaConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongo,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            db_name: "rtsp_app".to_string(),
            collection: "overlays".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("./uploads"),
            hls_dir: PathBuf::from("../frontend/public/hls"),
            max_upload_size: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(url) = env::var("PUBLIC_BASE_URL")
            && !url.is_empty()
        {
            config.public_base_url = Some(url);
        }

        // Store config
        if let Ok(val) = env::var("STORE_BACKEND") {
            match StoreBackend::parse(&val) {
                Some(backend) => config.store.backend = backend,
                None => tracing::warn!(
                    "Unknown STORE_BACKEND {:?}, using {:?}",
                    val,
                    config.store.backend
                ),
            }
        }
        if let Ok(uri) = env::var("MONGO_URI")
            && !uri.is_empty()
        {
            config.store.mongo_uri = uri;
        }
        if let Ok(name) = env::var("DB_NAME")
            && !name.is_empty()
        {
            config.store.db_name = name;
        }
        if let Ok(name) = env::var("OVERLAY_COLLECTION")
            && !name.is_empty()
        {
            config.store.collection = name;
        }

        // Media config
        if let Ok(path) = env::var("UPLOADS_DIR")
            && !path.is_empty()
        {
            config.media.uploads_dir = PathBuf::from(path);
        }
        if let Ok(path) = env::var("HLS_FOLDER")
            && !path.is_empty()
        {
            config.media.hls_dir = PathBuf::from(path);
        }
        if let Ok(val) = env::var("UPLOAD_MAX_SIZE_MB")
            && let Ok(mb) = val.parse::<usize>()
        {
            match megabytes_to_bytes(mb) {
                Some(bytes) => config.media.max_upload_size = Some(bytes),
                None => tracing::warn!(
                    "UPLOAD_MAX_SIZE_MB={} is too large, uploads stay unlimited",
                    mb
                ),
            }
        }

        // Static files
        if let Ok(path) = env::var("STATIC_FILES_DIR")
            && !path.is_empty()
        {
            config.static_files.dir = Some(PathBuf::from(path));
        }

        config
    }

    /// Base URL that upload links are built from, without a trailing slash
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

fn megabytes_to_bytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}
