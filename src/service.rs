//! Image service for picvault.
//!
//! This module provides the upload pipeline that request handlers call:
//! - Size and declared-length checks on the incoming stream
//! - Content sniffing against the image allow-list
//! - Storage through an [`ImageStore`]
//! - Best-effort thumbnail derivation after the save has committed

use std::io::Read;

use tracing::{info, warn};

use crate::config::Config;
use crate::store::{classify, is_allowed_image_type, ImageStore, ObjectRecord, Usage, Variant};
use crate::thumbnail::{ThumbnailError, ThumbnailGenerator};
use crate::{PicvaultError, Result};

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// What happened to the thumbnail of a new upload.
#[derive(Debug)]
pub enum ThumbnailOutcome {
    /// A thumbnail was derived and attached to the record.
    Attached,
    /// Thumbnail generation is disabled.
    Skipped,
    /// Derivation failed; the record is served from its original.
    Failed(ThumbnailError),
}

impl ThumbnailOutcome {
    /// Whether a thumbnail is now attached.
    pub fn is_attached(&self) -> bool {
        matches!(self, ThumbnailOutcome::Attached)
    }
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct Upload {
    /// The stored record, including `thumb_path` when one was attached.
    pub record: ObjectRecord,
    /// Secondary outcome of thumbnail derivation.
    pub thumbnail: ThumbnailOutcome,
}

/// Image service for managing uploads and downloads.
pub struct ImageService<S> {
    store: S,
    thumbnails: Option<ThumbnailGenerator>,
    max_upload_bytes: u64,
}

impl<S: ImageStore> ImageService<S> {
    /// Create a new ImageService with default limits.
    pub fn new(store: S) -> Self {
        Self {
            store,
            thumbnails: Some(ThumbnailGenerator::default()),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Create a new ImageService configured from `config`.
    pub fn from_config(store: S, config: &Config) -> Self {
        let thumbnails = config
            .thumbnail
            .enabled
            .then(|| ThumbnailGenerator::new(config.thumbnail.max_edge));

        Self {
            store,
            thumbnails,
            max_upload_bytes: config.storage.max_upload_bytes(),
        }
    }

    /// Set a custom max upload size.
    pub fn with_max_upload_bytes(mut self, max_bytes: u64) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    /// Set the thumbnail generator; `None` disables thumbnails.
    pub fn with_thumbnails(mut self, thumbnails: Option<ThumbnailGenerator>) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload an image.
    ///
    /// # Validation
    /// - Size: max configured size (default 10MB)
    /// - Content: must sniff as JPEG, PNG, GIF or WebP
    ///
    /// Thumbnail failure does not fail the upload; see [`Upload::thumbnail`].
    pub fn upload(&self, owner_id: &str, filename: &str, content: &[u8]) -> Result<Upload> {
        self.check_size(content.len() as u64)?;

        let mime_type = classify(content);
        if !is_allowed_image_type(mime_type) {
            return Err(PicvaultError::UnsupportedMediaType(mime_type.to_string()));
        }

        let record = self.store.save(owner_id, filename, mime_type, content)?;

        let Some(generator) = &self.thumbnails else {
            return Ok(Upload {
                record,
                thumbnail: ThumbnailOutcome::Skipped,
            });
        };

        match generator.derive(&self.store, &record, content) {
            Ok(updated) => Ok(Upload {
                record: updated,
                thumbnail: ThumbnailOutcome::Attached,
            }),
            Err(e) => {
                warn!(id = %record.id, error = %e, "Thumbnail generation failed");
                Ok(Upload {
                    record,
                    thumbnail: ThumbnailOutcome::Failed(e),
                })
            }
        }
    }

    /// Upload an image from a stream with a declared content length.
    ///
    /// The declared length is checked against the size limit before any
    /// bytes are read, and against the bytes actually received afterwards.
    pub fn upload_from_reader<R: Read>(
        &self,
        owner_id: &str,
        filename: &str,
        reader: R,
        declared_len: u64,
    ) -> Result<Upload> {
        self.check_size(declared_len)?;

        let mut content = Vec::with_capacity(declared_len as usize);
        reader
            .take(declared_len.saturating_add(1))
            .read_to_end(&mut content)?;

        if content.len() as u64 != declared_len {
            return Err(PicvaultError::Validation(format!(
                "declared length {declared_len} does not match received length {}",
                content.len()
            )));
        }

        self.upload(owner_id, filename, &content)
    }

    /// Get image metadata.
    pub fn get(&self, owner_id: &str, id: &str) -> Result<ObjectRecord> {
        self.store.get(owner_id, id)
    }

    /// Get image content; thumbnails fall back to the original.
    pub fn content(&self, owner_id: &str, id: &str, variant: Variant) -> Result<Vec<u8>> {
        self.store.read(owner_id, id, variant)
    }

    /// Delete an image.
    pub fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        self.store.delete(owner_id, id)
    }

    /// List images, newest first.
    pub fn list(&self, owner_id: &str) -> Vec<ObjectRecord> {
        let mut records = self.store.list(owner_id);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Quota usage for the caller's scope.
    pub fn usage(&self, owner_id: &str) -> Usage {
        let usage = self.store.usage(owner_id);
        info!(owner = %owner_id, usage = %usage, "Usage summary");
        usage
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_upload_bytes {
            let max_mb = self.max_upload_bytes / 1024 / 1024;
            return Err(PicvaultError::Validation(format!(
                "file too large ({size} bytes, max {max_mb}MB)"
            )));
        }
        Ok(())
    }
}
