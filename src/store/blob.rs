//! Blob storage for picvault.
//!
//! Originals and thumbnails live on the local filesystem:
//! - Originals are named after their object id
//! - Thumbnails share the id with a `_thumb` suffix in their own subdirectory
//! - Writes remove partially written files on failure

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{PicvaultError, Result};

/// Blob storage for original uploads and their thumbnails.
///
/// Files are stored in a flat directory structure:
/// ```text
/// {base_path}/
/// ├── 0b5e1c7a-4d55-4b0e-9a43-2f1f0c9d8e11.png
/// ├── 9f3e...-....jpg
/// └── thumbnails/
///     └── 0b5e1c7a-4d55-4b0e-9a43-2f1f0c9d8e11_thumb.png
/// ```
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Base directory for blob storage.
    base_path: PathBuf,
    /// Thumbnail subdirectory name, relative to `base_path`.
    thumbnail_dir: String,
}

impl BlobStore {
    /// Create a new BlobStore rooted at `base_path`.
    ///
    /// The base directory and the thumbnail subdirectory are created if
    /// they don't exist.
    pub fn new(base_path: impl Into<PathBuf>, thumbnail_dir: impl Into<String>) -> Result<Self> {
        let base_path = base_path.into();
        let thumbnail_dir = thumbnail_dir.into();
        fs::create_dir_all(base_path.join(&thumbnail_dir))?;

        Ok(Self {
            base_path,
            thumbnail_dir,
        })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Relative blob path for an object id and extension.
    pub fn blob_name(id: &str, ext: &str) -> String {
        format!("{id}{ext}")
    }

    /// Relative thumbnail path for an object id and extension.
    pub fn thumbnail_name(&self, id: &str, ext: &str) -> String {
        format!("{}/{id}_thumb{ext}", self.thumbnail_dir)
    }

    /// Relative thumbnail path for a stored `thumb_path` value.
    ///
    /// Older snapshots record only the thumbnail's file name; such names
    /// live in the thumbnail directory.
    pub fn thumbnail_location(&self, stored: &str) -> String {
        if stored.contains(['/', '\\']) {
            stored.to_string()
        } else {
            format!("{}/{stored}", self.thumbnail_dir)
        }
    }

    /// Write `content` to the relative path `name`.
    ///
    /// On any failure the partially written file is removed before the
    /// error is returned.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(name);

        let result = File::create(&path).and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        });

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial blob");
                }
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Load content from storage.
    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        match fs::read(self.resolve(name)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PicvaultError::NotFound(format!("blob {name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file from storage.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.resolve(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the full path for a relative name.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}
