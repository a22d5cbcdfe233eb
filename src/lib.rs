//! picvault - personal image hosting backend
//!
//! Storage and metadata core: durable, concurrency-safe persistence of
//! uploaded images with per-account quota accounting and thumbnails.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod store;
pub mod thumbnail;

pub use config::Config;
pub use error::{PicvaultError, Result};
pub use service::{ImageService, ThumbnailOutcome, Upload};
pub use store::{
    classify, is_allowed_image_type, new_id, sanitize, ImageStore, LocalImageStore, ObjectRecord,
    Scope, TenancyMode, Usage, Variant,
};
pub use thumbnail::{Thumbnail, ThumbnailError, ThumbnailGenerator};
