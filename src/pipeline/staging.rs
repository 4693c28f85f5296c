//! Temporary media staging.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// A locally staged copy of remote media content.
///
/// The file is held only for the duration of one delivery attempt.
/// Whoever owns the value owns the file: it is removed exactly once,
/// when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedMedia {
    path: PathBuf,
    size_bytes: u64,
    content_type: Option<String>,
}

impl StagedMedia {
    /// Wraps an already-downloaded file.
    #[must_use]
    pub fn new(path: PathBuf, size_bytes: u64, content_type: Option<String>) -> Self {
        Self {
            path,
            size_bytes,
            content_type,
        }
    }

    /// Path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the staged file in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Content type to use for the binary multipart part.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }

    /// File name component of the staged path.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| "file".to_owned(), |n| n.to_string_lossy().into_owned())
    }
}

impl Drop for StagedMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged media file: {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove staged media file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
