//! Disk-backed media store for gallery images
//!
//! Maps stored files to public-relative `/media/...` URLs. Filenames
//! are random (uuid v4, 128 bits) so concurrent uploads never contend
//! on a path and collisions are negligible.

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Public URL prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/media";

/// Disk media store rooted at a single directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media root if it does not exist yet
    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Internal(format!("Failed to create media directory: {}", e))
        })?;
        Ok(())
    }

    /// Write encoded bytes under a fresh random name
    ///
    /// Returns the public-relative URL for the new file. A write
    /// failure is fatal for the enclosing upload: the caller must not
    /// persist a database row for this file.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> AppResult<String> {
        let name = format!("{}{}", Uuid::new_v4().simple(), extension);
        let path = self.root.join(&name);

        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageWrite(format!("Failed to write {}: {}", name, e)))?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }

    /// Remove the file behind a stored URL, best effort
    ///
    /// A missing file is a no-op; other failures are logged and
    /// swallowed after this single attempt so filesystem state never
    /// blocks the corresponding database mutation.
    pub async fn delete(&self, url: &str) {
        let Some(path) = self.file_path(url) else {
            tracing::warn!("Refusing to delete media outside the store: {}", url);
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to delete media file {:?}: {}", path, e);
            }
        }
    }

    /// Resolve a stored URL to its on-disk path
    ///
    /// Only the final path component is used, so a hostile URL cannot
    /// traverse out of the media root.
    pub fn file_path(&self, url: &str) -> Option<PathBuf> {
        let name = Path::new(url).file_name()?;
        if name.to_string_lossy().starts_with('.') {
            return None;
        }
        Some(self.root.join(name))
    }
}
