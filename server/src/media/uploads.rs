//! Upload directory handling
//!
//! Files are streamed into a hidden temporary file next to their final
//! location and renamed into place once complete. A rename replaces the
//! target atomically, so concurrent uploads of the same name end with the
//! content of whichever finished last, never a mix of both.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::MediaError;

/// Longest accepted filename, in bytes
const MAX_FILENAME_LEN: usize = 255;

/// Check that a client-supplied filename is a single, safe path component.
///
/// Accepts ASCII letters, digits, `.`, `_`, `-` and space. The name must not
/// start with a dot, which also rules out `.` and `..`.
pub fn validate_filename(filename: &str) -> Result<&str, MediaError> {
    let invalid =
        |reason: &str| MediaError::InvalidFilename(format!("{:?} {}", filename, reason));

    if filename.is_empty() {
        return Err(invalid("is empty"));
    }
    if filename.len() > MAX_FILENAME_LEN {
        return Err(invalid("is too long"));
    }
    if filename.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if let Some(c) = filename
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ')))
    {
        return Err(invalid(&format!("contains disallowed character {:?}", c)));
    }

    Ok(filename)
}

/// Public URL of an uploaded file
pub fn upload_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}/uploads/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(filename)
    )
}

/// Directory uploaded files are stored in
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk path for `filename`, which is guaranteed to sit directly
    /// under the upload root.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, MediaError> {
        let filename = validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    /// Start writing an upload. Nothing is visible under `filename` until
    /// [`PendingUpload::commit`] succeeds.
    pub async fn begin(&self, filename: &str) -> Result<PendingUpload, MediaError> {
        let final_path = self.resolve(filename)?;
        let temp = TempPath::new(self.root.join(format!(".upload-{}.part", Uuid::new_v4())));
        let file = File::create(&temp.path).await?;

        debug!("Receiving upload {:?} into {:?}", filename, temp.path);

        Ok(PendingUpload {
            file,
            temp,
            final_path,
            written: 0,
        })
    }
}

/// Path of a partial upload, removed on drop unless kept
struct TempPath {
    path: PathBuf,
    keep: bool,
}

impl TempPath {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial upload {:?}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial upload {:?}: {}", self.path, e),
        }
    }
}

/// An upload being streamed to disk.
///
/// Dropping it before [`commit`](Self::commit), for example when the client
/// disconnects mid-upload, removes the partial file.
pub struct PendingUpload {
    // Declared before `temp` so the handle is closed before the file is removed
    file: File,
    temp: TempPath,
    final_path: PathBuf,
    written: u64,
}

impl PendingUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), MediaError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Move the finished file into place, replacing any existing file
    pub async fn commit(mut self) -> Result<(), MediaError> {
        self.file.flush().await?;

        let Self {
            file,
            mut temp,
            final_path,
            written,
        } = self;
        drop(file);

        fs::rename(&temp.path, &final_path).await?;
        temp.keep = true;

        debug!("Stored upload {:?} ({} bytes)", final_path, written);
        Ok(())
    }

    /// Discard the partial file
    pub fn abort(self) {
        debug!("Discarding upload for {:?}", self.final_path);
    }
}
