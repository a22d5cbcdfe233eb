//! Local filesystem implementation of [`ImageStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::blob::BlobStore;
use super::classify::{extension_for_mime, is_allowed_image_type};
use super::id::new_id;
use super::quota::{QuotaLedger, Scope, Usage};
use super::record::ObjectRecord;
use super::sanitize::sanitize;
use super::snapshot::Snapshot;
use super::{ImageStore, TenancyMode, Variant};
use crate::config::Config;
use crate::{PicvaultError, Result};

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_FILE: &str = "metadata.json";

/// Default thumbnail subdirectory.
pub const DEFAULT_THUMBNAIL_DIR: &str = "thumbnails";

/// Index and quota counters, guarded together by one lock.
#[derive(Debug)]
struct IndexState {
    records: HashMap<String, ObjectRecord>,
    quota: QuotaLedger,
}

/// Image store backed by a local directory and a JSON snapshot.
///
/// # Thread Safety
///
/// Reads (`get`, `list`, `read`, `usage`) share a read lock. Mutations
/// (`save`, `delete`, `attach_thumbnail`) hold the write lock for the whole
/// critical section, including the snapshot write, so the index, the quota
/// counters and the snapshot change as one unit.
#[derive(Debug)]
pub struct LocalImageStore {
    blobs: BlobStore,
    snapshot: Snapshot,
    tenancy: TenancyMode,
    state: RwLock<IndexState>,
}

impl LocalImageStore {
    /// Open a store rooted at `base_path` with the default layout.
    pub fn open(
        base_path: impl Into<PathBuf>,
        tenancy: TenancyMode,
        limit_bytes: u64,
    ) -> Result<Self> {
        Self::open_with_layout(
            base_path,
            DEFAULT_SNAPSHOT_FILE,
            DEFAULT_THUMBNAIL_DIR,
            tenancy,
            limit_bytes,
        )
    }

    /// Open a store as described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open_with_layout(
            &config.storage.path,
            &config.storage.snapshot_file,
            &config.storage.thumbnail_dir,
            config.storage.tenancy(),
            config.quota.limit_bytes,
        )
    }

    /// Open a store with explicit snapshot file and thumbnail directory names.
    ///
    /// Creates the directories, loads an existing snapshot and rebuilds the
    /// quota ledger from the loaded records.
    pub fn open_with_layout(
        base_path: impl Into<PathBuf>,
        snapshot_file: &str,
        thumbnail_dir: &str,
        tenancy: TenancyMode,
        limit_bytes: u64,
    ) -> Result<Self> {
        if limit_bytes == 0 {
            return Err(PicvaultError::Validation(
                "quota limit must be at least 1 byte".to_string(),
            ));
        }

        let base_path = base_path.into();
        let blobs = BlobStore::new(&base_path, thumbnail_dir)?;
        let snapshot = Snapshot::new(base_path.join(snapshot_file));
        let mut records = snapshot.load()?;

        let mut relocated = 0;
        for record in records.values_mut() {
            if let Some(thumb_path) = record.thumb_path.as_mut() {
                let location = blobs.thumbnail_location(thumb_path);
                if location != *thumb_path {
                    *thumb_path = location;
                    relocated += 1;
                }
            }
        }
        if relocated > 0 {
            debug!(count = relocated, "Resolved bare thumbnail names from snapshot");
        }

        let quota = QuotaLedger::from_entries(
            limit_bytes,
            records
                .values()
                .map(|r| (scope_of(tenancy, r), r.size_bytes)),
        );

        info!(
            path = %base_path.display(),
            records = records.len(),
            ?tenancy,
            "Opened image store"
        );

        Ok(Self {
            blobs,
            snapshot,
            tenancy,
            state: RwLock::new(IndexState { records, quota }),
        })
    }

    /// Tenancy mode of this store.
    pub fn tenancy(&self) -> TenancyMode {
        self.tenancy
    }

    /// Absolute path of a record's relative blob or thumbnail path.
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.blobs.resolve(relative)
    }

    /// Path of the snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        self.snapshot.path()
    }

    /// Number of records across all owners.
    pub fn len(&self) -> usize {
        self.read_state().records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_visible(&self, record: &ObjectRecord, owner_id: &str) -> bool {
        match self.tenancy {
            TenancyMode::Single => true,
            TenancyMode::Multi => record.is_owned_by(owner_id),
        }
    }

    fn find_visible(&self, state: &IndexState, owner_id: &str, id: &str) -> Result<ObjectRecord> {
        state
            .records
            .get(id)
            .filter(|r| self.is_visible(r, owner_id))
            .cloned()
            .ok_or_else(|| PicvaultError::NotFound(format!("image {id}")))
    }
}

/// Quota scope a record is accounted to.
fn scope_of(tenancy: TenancyMode, record: &ObjectRecord) -> Scope {
    match (tenancy, &record.owner_id) {
        (TenancyMode::Multi, Some(owner)) => Scope::Account(owner.clone()),
        _ => Scope::Global,
    }
}

/// Extension for a new blob: the sanitized name's, else one derived from the MIME type.
fn blob_extension(original_name: &str, mime_type: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| extension_for_mime(mime_type).to_string())
}

impl ImageStore for LocalImageStore {
    fn save(
        &self,
        owner_id: &str,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<ObjectRecord> {
        if !is_allowed_image_type(mime_type) {
            return Err(PicvaultError::UnsupportedMediaType(mime_type.to_string()));
        }
        if self.tenancy == TenancyMode::Multi && owner_id.is_empty() {
            return Err(PicvaultError::Validation("owner id is required".to_string()));
        }

        let original_name = sanitize(filename);
        let ext = blob_extension(&original_name, mime_type);
        let size_bytes = content.len() as u64;
        let scope = self.tenancy.scope(owner_id);

        let mut state = self.write_state();

        let id = loop {
            let id = new_id();
            if !state.records.contains_key(&id) {
                break id;
            }
        };
        let blob_path = BlobStore::blob_name(&id, &ext);

        state.quota.reserve(&scope, size_bytes)?;

        if let Err(e) = self.blobs.write(&blob_path, content) {
            state.quota.release(&scope, size_bytes);
            return Err(e);
        }

        let record = ObjectRecord {
            id: id.clone(),
            owner_id: match self.tenancy {
                TenancyMode::Single => None,
                TenancyMode::Multi => Some(owner_id.to_string()),
            },
            original_name,
            size_bytes,
            mime_type: mime_type.to_string(),
            blob_path,
            thumb_path: None,
            created_at: Utc::now(),
        };
        state.records.insert(id.clone(), record.clone());

        if let Err(e) = self.snapshot.save(&state.records) {
            state.records.remove(&id);
            state.quota.release(&scope, size_bytes);
            if let Err(cleanup) = self.blobs.delete(&record.blob_path) {
                warn!(id = %id, error = %cleanup, "Failed to remove blob during rollback");
            }
            warn!(id = %id, error = %e, "Snapshot write failed, save rolled back");
            return Err(e);
        }

        info!(
            id = %record.id,
            owner = %owner_id,
            size = size_bytes,
            mime_type = %record.mime_type,
            "Stored image"
        );

        Ok(record)
    }

    fn get(&self, owner_id: &str, id: &str) -> Result<ObjectRecord> {
        let state = self.read_state();
        self.find_visible(&state, owner_id, id)
    }

    fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        let mut state = self.write_state();
        let record = self.find_visible(&state, owner_id, id)?;

        if !self.blobs.delete(&record.blob_path)? {
            warn!(id = %id, path = %record.blob_path, "Blob already missing on delete");
        }

        if let Some(thumb_path) = &record.thumb_path {
            if let Err(e) = self.blobs.delete(thumb_path) {
                warn!(id = %id, error = %e, "Failed to remove thumbnail");
            }
        }

        state.records.remove(id);
        state
            .quota
            .release(&scope_of(self.tenancy, &record), record.size_bytes);

        self.snapshot.save(&state.records)?;

        info!(id = %id, owner = %owner_id, size = record.size_bytes, "Deleted image");
        Ok(())
    }

    fn list(&self, owner_id: &str) -> Vec<ObjectRecord> {
        let state = self.read_state();
        state
            .records
            .values()
            .filter(|r| self.is_visible(r, owner_id))
            .cloned()
            .collect()
    }

    fn usage(&self, owner_id: &str) -> Usage {
        self.read_state().quota.usage(&self.tenancy.scope(owner_id))
    }

    fn read(&self, owner_id: &str, id: &str, variant: Variant) -> Result<Vec<u8>> {
        let state = self.read_state();
        let record = self.find_visible(&state, owner_id, id)?;

        let path = match (variant, &record.thumb_path) {
            (Variant::Thumbnail, Some(thumb_path)) => thumb_path,
            _ => &record.blob_path,
        };
        debug!(id = %id, ?variant, path = %path, "Reading image");

        self.blobs.load(path)
    }

    fn attach_thumbnail(&self, id: &str, thumbnail: &[u8]) -> Result<ObjectRecord> {
        let mut state = self.write_state();

        let Some(record) = state.records.get(id).cloned() else {
            return Err(PicvaultError::NotFound(format!("image {id}")));
        };
        if record.has_thumbnail() {
            return Err(PicvaultError::Validation(format!(
                "image {id} already has a thumbnail"
            )));
        }

        let thumb_path = self.blobs.thumbnail_name(id, record.extension());
        self.blobs.write(&thumb_path, thumbnail)?;

        let updated = ObjectRecord {
            thumb_path: Some(thumb_path.clone()),
            ..record.clone()
        };
        state.records.insert(id.to_string(), updated.clone());

        if let Err(e) = self.snapshot.save(&state.records) {
            state.records.insert(id.to_string(), record);
            if let Err(cleanup) = self.blobs.delete(&thumb_path) {
                warn!(id = %id, error = %cleanup, "Failed to remove thumbnail during rollback");
            }
            return Err(e);
        }

        debug!(id = %id, path = %thumb_path, "Attached thumbnail");
        Ok(updated)
    }
}
