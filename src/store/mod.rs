//! Image storage for picvault.
//!
//! This module provides the storage and metadata core:
//! - Unique identifiers and safe display names
//! - Content-type sniffing against an image allow-list
//! - Original blobs and thumbnails on the local filesystem
//! - A JSON snapshot of the metadata index
//! - Per-scope quota accounting

mod blob;
mod classify;
mod id;
mod local;
mod quota;
mod record;
mod sanitize;
mod snapshot;

pub use blob::BlobStore;
pub use classify::{classify, extension_for_mime, is_allowed_image_type, SNIFF_LEN};
pub use id::new_id;
pub use local::LocalImageStore;
pub use quota::{QuotaLedger, Scope, Usage};
pub use record::ObjectRecord;
pub use sanitize::{sanitize, FALLBACK_NAME};
pub use snapshot::Snapshot;

use crate::Result;

/// MIME types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// How records and quota are partitioned between accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenancyMode {
    /// One shared namespace and quota; owner ids are ignored.
    Single,
    /// Records and quota are scoped to the owning account.
    Multi,
}

impl TenancyMode {
    /// Quota scope for the given owner.
    pub fn scope(self, owner_id: &str) -> Scope {
        match self {
            TenancyMode::Single => Scope::Global,
            TenancyMode::Multi => Scope::Account(owner_id.to_string()),
        }
    }
}

/// Which stored file to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The uploaded bytes, verbatim.
    Original,
    /// The derived thumbnail, or the original when none is attached.
    Thumbnail,
}

/// Storage contract used by request handlers.
///
/// Implementations must be safe to share between threads. All failures are
/// per-call; no method leaves the index pointing at a missing blob.
pub trait ImageStore: Send + Sync {
    /// Store a new image and record it in the index.
    fn save(
        &self,
        owner_id: &str,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<ObjectRecord>;

    /// Get a record visible to `owner_id`.
    fn get(&self, owner_id: &str, id: &str) -> Result<ObjectRecord>;

    /// Delete a record together with its blob and thumbnail.
    fn delete(&self, owner_id: &str, id: &str) -> Result<()>;

    /// List every record visible to `owner_id`, in no particular order.
    fn list(&self, owner_id: &str) -> Vec<ObjectRecord>;

    /// Current quota usage for the scope of `owner_id`.
    fn usage(&self, owner_id: &str) -> Usage;

    /// Read the stored bytes of a record.
    fn read(&self, owner_id: &str, id: &str, variant: Variant) -> Result<Vec<u8>>;

    /// Store thumbnail bytes for an existing record and set its `thumb_path`.
    fn attach_thumbnail(&self, id: &str, thumbnail: &[u8]) -> Result<ObjectRecord>;
}
