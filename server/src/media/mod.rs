//! Media module
//!
//! This module provides:
//! - `UploadDir` for streaming uploads onto local disk
//! - HTTP routes for uploading files and serving uploads and HLS assets

pub mod routes;
mod types;
mod uploads;

pub use routes::{MediaAppState, media_routes};
pub use types::{MediaError, UploadResponse};
pub use uploads::{PendingUpload, UploadDir, upload_url, validate_filename};
