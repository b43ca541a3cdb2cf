//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use mongodb::bson::oid::ObjectId;
use overlayhub_server::config::{Config, MediaConfig, StaticFilesConfig};
use overlayhub_server::overlay::{Overlay, OverlayError, OverlayPatch, OverlayStore};
use overlayhub_server::{MemoryOverlayStore, build_app};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_BASE_URL: &str = "http://media.test";
const BOUNDARY: &str = "overlayhub-test-boundary";

/// A router wired to an in-memory store and temporary media directories
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryOverlayStore>,
    pub uploads_dir: PathBuf,
    pub hls_dir: PathBuf,
    /// Parent of the media directories; removed on drop
    pub root: TempDir,
}

impl TestApp {
    /// Send a request and return status, headers and body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Send a request and parse the body as JSON
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    /// Create an overlay through the API and return its `_id`
    pub async fn create_overlay(&self, body: Value) -> String {
        let (status, json) = self
            .send_json(json_request("POST", "/api/overlays", &body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
        json["_id"].as_str().unwrap().to_string()
    }

    /// List overlays through the API
    pub async fn list_overlays(&self) -> Vec<Value> {
        let (status, json) = self.send_json(get_request("/api/overlays")).await;
        assert_eq!(status, StatusCode::OK);
        json.as_array().unwrap().clone()
    }
}

fn test_config(root: &TempDir, static_dir: Option<PathBuf>) -> Config {
    Config {
        public_base_url: Some(TEST_BASE_URL.to_string()),
        media: MediaConfig {
            uploads_dir: root.path().join("uploads"),
            hls_dir: root.path().join("hls"),
            max_upload_size: None,
        },
        static_files: StaticFilesConfig { dir: static_dir },
        ..Config::default()
    }
}

fn build_test_app(config: Config, root: TempDir) -> TestApp {
    std::fs::create_dir_all(&config.media.uploads_dir).unwrap();
    std::fs::create_dir_all(&config.media.hls_dir).unwrap();

    let store = Arc::new(MemoryOverlayStore::new());
    let router = build_app(&config, store.clone());

    TestApp {
        router,
        store,
        uploads_dir: config.media.uploads_dir.clone(),
        hls_dir: config.media.hls_dir.clone(),
        root,
    }
}

/// Create a test application with an empty store and empty media directories
pub fn create_test_app() -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root, None);
    build_test_app(config, root)
}

/// Create a test application with an upload size limit
pub fn create_test_app_with_upload_limit(limit: usize) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let mut config = test_config(&root, None);
    config.media.max_upload_size = Some(limit);
    build_test_app(config, root)
}

/// Create a test application serving a frontend build with an `index.html`
pub fn create_test_app_with_static_files(index_html: &str) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let static_dir = root.path().join("build");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), index_html).unwrap();

    let config = test_config(&root, Some(static_dir));
    build_test_app(config, root)
}

/// Create a test application on top of an arbitrary store
pub fn create_test_app_with_store(store: Arc<dyn OverlayStore>) -> (Router, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root, None);
    std::fs::create_dir_all(&config.media.uploads_dir).unwrap();
    (build_app(&config, store), root)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// One part of a multipart/form-data body
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            data,
        }
    }

    pub fn text(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: None,
            data,
        }
    }
}

/// Build a `POST /api/upload` request with the given parts
pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a `POST /api/upload` request whose body sends the start of a `file`
/// part and then never completes, like a client that stalls mid-upload
pub fn stalled_upload_request(filename: &str, data: &[u8]) -> Request<Body> {
    let mut head = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        BOUNDARY, filename
    )
    .into_bytes();
    head.extend_from_slice(data);

    let stream = futures_util::stream::once(async move {
        Ok::<_, std::io::Error>(Bytes::from(head))
    })
    .chain(futures_util::stream::pending());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from_stream(stream))
        .unwrap()
}

/// Store whose every call fails, standing in for an unreachable database
pub struct FailingOverlayStore {
    pub message: String,
}

impl FailingOverlayStore {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    fn fail<T>(&self) -> Result<T, OverlayError> {
        Err(OverlayError::Storage(self.message.clone()))
    }
}

#[async_trait]
impl OverlayStore for FailingOverlayStore {
    async fn create(&self, _fields: OverlayPatch) -> Result<Overlay, OverlayError> {
        self.fail()
    }

    async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        self.fail()
    }

    async fn update(&self, _id: ObjectId, _patch: OverlayPatch) -> Result<Overlay, OverlayError> {
        self.fail()
    }

    async fn delete(&self, _id: ObjectId) -> Result<(), OverlayError> {
        self.fail()
    }

    async fn ping(&self) -> Result<(), OverlayError> {
        self.fail()
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Initialize test logging for detailed output
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overlayhub_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
