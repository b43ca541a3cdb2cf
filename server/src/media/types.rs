//! Media-related types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when accepting uploads
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Failed to read upload: {0}")]
    Multipart(String),

    #[error("Upload exceeds the configured size limit")]
    TooLarge,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Response body for a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Absolute URL the file can be fetched from
    pub url: String,
}
