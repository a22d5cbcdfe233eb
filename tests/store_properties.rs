//! End-to-end properties of the local image store.
//!
//! These tests drive the public API only and check the on-disk state
//! (blobs, thumbnails, snapshot) after each operation.

use std::collections::HashSet;
use std::fs;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

use picvault::{
    sanitize, ImageService, ImageStore, LocalImageStore, PicvaultError, TenancyMode, Variant,
};

/// Encode a solid-color PNG.
fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([120, 40, 220, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// PNG signature padded to `len` bytes.
fn png_payload(len: usize) -> Vec<u8> {
    let mut content = b"\x89PNG\r\n\x1a\n".to_vec();
    content.resize(len, 0);
    content
}

fn open(temp_dir: &TempDir, limit: u64) -> LocalImageStore {
    LocalImageStore::open(temp_dir.path(), TenancyMode::Multi, limit).unwrap()
}

/// Sum of record sizes visible to `owner`.
fn live_bytes(store: &LocalImageStore, owner: &str) -> u64 {
    store.list(owner).iter().map(|r| r.size_bytes).sum()
}

#[test]
fn test_ids_are_unique() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, u64::MAX);

    let ids: HashSet<String> = (0..200)
        .map(|i| {
            store
                .save("alice", &format!("{i}.png"), "image/png", &png_payload(16))
                .unwrap()
                .id
        })
        .collect();

    assert_eq!(ids.len(), 200);
}

#[test]
fn test_quota_conservation() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, 100_000);

    let mut saved = Vec::new();
    for (i, owner) in ["alice", "bob", "alice", "carol", "bob", "alice"]
        .iter()
        .enumerate()
    {
        let record = store
            .save(owner, "x.png", "image/png", &png_payload(100 + i * 37))
            .unwrap();
        saved.push((owner.to_string(), record.id));

        for scope in ["alice", "bob", "carol"] {
            assert_eq!(store.usage(scope).used_bytes, live_bytes(&store, scope));
        }
    }

    for (owner, id) in saved.iter().step_by(2) {
        store.delete(owner, id).unwrap();

        for scope in ["alice", "bob", "carol"] {
            assert_eq!(store.usage(scope).used_bytes, live_bytes(&store, scope));
        }
    }
}

#[test]
fn test_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, 1_000_000);
    let content = png(32, 32);

    let saved = store
        .save("alice", "photo.png", "image/png", &content)
        .unwrap();
    let fetched = store.get("alice", &saved.id).unwrap();

    assert_eq!(fetched.size_bytes, saved.size_bytes);
    assert_eq!(fetched.mime_type, saved.mime_type);
    assert_eq!(fetched.original_name, saved.original_name);
    assert_eq!(
        fs::metadata(store.path_of(&fetched.blob_path)).unwrap().len(),
        fetched.size_bytes
    );
    assert_eq!(
        store.read("alice", &saved.id, Variant::Original).unwrap(),
        content
    );
}

#[test]
fn test_delete_completeness() {
    let temp_dir = TempDir::new().unwrap();
    let service = ImageService::new(open(&temp_dir, 1_000_000));

    let upload = service.upload("alice", "wide.png", &png(900, 300)).unwrap();
    let record = upload.record;
    let thumb_path = record.thumb_path.clone().expect("thumbnail attached");
    assert!(service.store().path_of(&thumb_path).exists());

    service.delete("alice", &record.id).unwrap();

    assert!(matches!(
        service.get("alice", &record.id),
        Err(PicvaultError::NotFound(_))
    ));
    assert!(!service.store().path_of(&record.blob_path).exists());
    assert!(!service.store().path_of(&thumb_path).exists());
}

#[test]
fn test_ownership_isolation() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, 1_000_000);

    let a = store
        .save("alice", "a.png", "image/png", &png_payload(50))
        .unwrap();
    let b = store
        .save("bob", "b.png", "image/png", &png_payload(60))
        .unwrap();

    let alice_ids: Vec<String> = store.list("alice").into_iter().map(|r| r.id).collect();
    assert_eq!(alice_ids, vec![a.id.clone()]);

    assert!(matches!(
        store.get("alice", &b.id),
        Err(PicvaultError::NotFound(_))
    ));
    assert!(matches!(
        store.delete("alice", &b.id),
        Err(PicvaultError::NotFound(_))
    ));

    // Bob's object survives Alice's attempts
    assert_eq!(store.get("bob", &b.id).unwrap(), b);
    assert!(store.path_of(&b.blob_path).exists());
    assert_eq!(store.usage("bob").used_bytes, 60);
    assert_eq!(store.usage("alice").used_bytes, 50);
}

#[test]
fn test_quota_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, 1000);

    store
        .save("alice", "a.png", "image/png", &png_payload(900))
        .unwrap();

    let err = store
        .save("alice", "b.png", "image/png", &png_payload(101))
        .unwrap_err();
    assert!(matches!(err, PicvaultError::QuotaExceeded { .. }));
    assert_eq!(store.usage("alice").used_bytes, 900);
    assert_eq!(store.len(), 1);

    store
        .save("alice", "c.png", "image/png", &png_payload(100))
        .unwrap();
    assert_eq!(store.usage("alice").used_bytes, 1000);
}

#[test]
fn test_sanitization() {
    let safe = sanitize("../../etc/passwd");
    assert!(!safe.contains('/'));
    assert!(!safe.contains('\\'));
    assert_eq!(sanitize(""), "image");
}

#[test]
fn test_unsupported_type_rejection() {
    let temp_dir = TempDir::new().unwrap();
    let service = ImageService::new(open(&temp_dir, 1_000_000));

    let result = service.upload("alice", "readme.png", b"plain old text file\n");

    assert!(matches!(
        result,
        Err(PicvaultError::UnsupportedMediaType(_))
    ));
    assert!(service.list("alice").is_empty());

    // Only the (empty) thumbnail directory exists
    let entries: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("thumbnails")]);
}

#[test]
fn test_snapshot_failure_rolls_back() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir, 1_000_000);

    // A directory where the snapshot file goes makes the final rename fail
    fs::create_dir(store.snapshot_path()).unwrap();

    let result = store.save("alice", "a.png", "image/png", &png_payload(64));

    assert!(matches!(result, Err(PicvaultError::Storage(_))));
    assert!(store.is_empty());
    assert_eq!(store.usage("alice").used_bytes, 0);

    let blobs: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    assert!(blobs.is_empty(), "orphaned files: {blobs:?}");
}

#[test]
fn test_restart_preserves_state() {
    let temp_dir = TempDir::new().unwrap();

    let record = {
        let service = ImageService::new(open(&temp_dir, 1_000_000));
        service.upload("alice", "a.png", &png(400, 400)).unwrap().record
    };

    let store = open(&temp_dir, 1_000_000);
    let reloaded = store.get("alice", &record.id).unwrap();

    assert_eq!(reloaded, record);
    assert!(reloaded.thumb_path.is_some());
    assert_eq!(store.usage("alice").used_bytes, record.size_bytes);
}

#[test]
fn test_loads_legacy_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("thumbnails")).unwrap();
    fs::write(temp_dir.path().join("legacy-id.jpg"), b"\xff\xd8\xffdata").unwrap();
    fs::write(temp_dir.path().join("plain-id.jpg"), b"\xff\xd8\xffmore").unwrap();
    fs::write(
        temp_dir.path().join("thumbnails/legacy-id_thumb.jpg"),
        b"\xff\xd8\xffthumb",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("metadata.json"),
        r#"{
  "legacy-id": {
    "id": "legacy-id",
    "filename": "old.jpg",
    "size": 7,
    "mime_type": "image/jpeg",
    "path": "legacy-id.jpg",
    "thumb_path": "legacy-id_thumb.jpg",
    "uploaded_at": "2024-01-02T03:04:05.123456789+08:00"
  },
  "plain-id": {
    "id": "plain-id",
    "filename": "plain.jpg",
    "size": 7,
    "mime_type": "image/jpeg",
    "path": "plain-id.jpg",
    "uploaded_at": "2024-01-03T03:04:05Z"
  }
}"#,
    )
    .unwrap();

    let store = LocalImageStore::open(temp_dir.path(), TenancyMode::Single, 1_000).unwrap();

    let record = store.get("", "legacy-id").unwrap();
    assert_eq!(record.original_name, "old.jpg");
    assert_eq!(store.usage("").used_bytes, 14);
    assert_eq!(
        store.read("", "legacy-id", Variant::Thumbnail).unwrap(),
        b"\xff\xd8\xffthumb"
    );
    assert_eq!(
        store.read("", "plain-id", Variant::Thumbnail).unwrap(),
        b"\xff\xd8\xffmore"
    );

    store.delete("", "legacy-id").unwrap();

    assert!(!temp_dir.path().join("legacy-id.jpg").exists());
    assert!(!temp_dir.path().join("thumbnails/legacy-id_thumb.jpg").exists());
    assert_eq!(store.usage("").used_bytes, 7);
}
