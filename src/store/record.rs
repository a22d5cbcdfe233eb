//! Metadata record for a stored image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one stored image.
///
/// Serialized field names match the snapshot format used by earlier
/// deployments, so existing `metadata.json` files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Unique object ID.
    pub id: String,
    /// Owning account; `None` in single-tenant mode.
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Sanitized original filename (display name).
    #[serde(rename = "filename")]
    pub original_name: String,
    /// Size of the original content in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Classified MIME type.
    pub mime_type: String,
    /// Blob path relative to the storage root (`{id}{ext}`).
    #[serde(rename = "path")]
    pub blob_path: String,
    /// Thumbnail path relative to the storage root, once derived.
    ///
    /// Older snapshots hold a bare file name here; the store resolves those
    /// against its thumbnail directory on open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_path: Option<String>,
    /// When the image was uploaded.
    #[serde(rename = "uploaded_at")]
    pub created_at: DateTime<Utc>,
}

impl ObjectRecord {
    /// Check whether `owner_id` may see this record.
    ///
    /// Records without an owner belong to the single-tenant namespace and
    /// are never visible to a scoped caller.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }

    /// Extension of the blob path, including the leading dot.
    pub fn extension(&self) -> &str {
        self.blob_path
            .strip_prefix(self.id.as_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(".bin")
    }

    /// Whether a thumbnail has been attached.
    pub fn has_thumbnail(&self) -> bool {
        self.thumb_path.is_some()
    }
}
