//! Durable snapshot of the metadata index.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::record::ObjectRecord;
use crate::Result;

/// JSON file holding the full `id -> record` index.
///
/// Writes go to a sibling temp file that is renamed over the snapshot, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    /// Create a snapshot handle for `path`. Nothing is read or written yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the index. A missing file yields an empty index.
    pub fn load(&self) -> Result<HashMap<String, ObjectRecord>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(HashMap::new());
        }

        Ok(serde_json::from_slice(&data)?)
    }

    /// Persist the full index.
    pub fn save(&self, records: &HashMap<String, ObjectRecord>) -> Result<()> {
        let ordered: BTreeMap<&str, &ObjectRecord> =
            records.iter().map(|(id, r)| (id.as_str(), r)).collect();
        let data = serde_json::to_vec_pretty(&ordered)?;

        let temp_path = self.temp_path();
        let result = fs::File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(id: &str) -> ObjectRecord {
        ObjectRecord {
            id: id.to_string(),
            owner_id: Some("alice".to_string()),
            original_name: "cat.png".to_string(),
            size_bytes: 3,
            mime_type: "image/png".to_string(),
            blob_path: format!("{id}.png"),
            thumb_path: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(temp_dir.path().join("metadata.json"));

        assert!(snapshot.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");
        fs::write(&path, "\n").unwrap();

        assert!(Snapshot::new(path).load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(temp_dir.path().join("metadata.json"));

        let mut records = HashMap::new();
        records.insert("a".to_string(), record("a"));
        records.insert("b".to_string(), record("b"));
        snapshot.save(&records).unwrap();

        assert_eq!(snapshot.load().unwrap(), records);
        assert!(!temp_dir.path().join("metadata.json.tmp").exists());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");
        fs::write(&path, "{ not json").unwrap();

        let result = Snapshot::new(path).load();
        assert!(matches!(result, Err(crate::PicvaultError::Snapshot(_))));
    }

    #[test]
    fn test_save_failure_keeps_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(temp_dir.path().join("metadata.json"));

        let mut records = HashMap::new();
        records.insert("a".to_string(), record("a"));
        snapshot.save(&records).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(temp_dir.path().join("metadata.json.tmp")).unwrap();
        records.insert("b".to_string(), record("b"));

        assert!(snapshot.save(&records).is_err());
        assert_eq!(snapshot.load().unwrap().len(), 1);
    }
}
