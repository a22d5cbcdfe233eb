//! Configuration module for picvault.

use serde::Deserialize;
use std::path::Path;

use crate::store::TenancyMode;
use crate::{PicvaultError, Result};

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for original blobs and the metadata snapshot.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Snapshot file name, relative to `path`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// Thumbnail subdirectory, relative to `path`.
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,
    /// Scope records and quota per account.
    #[serde(default = "default_multi_tenant")]
    pub multi_tenant: bool,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/uploads".to_string()
}

fn default_snapshot_file() -> String {
    "metadata.json".to_string()
}

fn default_thumbnail_dir() -> String {
    "thumbnails".to_string()
}

fn default_multi_tenant() -> bool {
    true
}

fn default_max_upload_size() -> u64 {
    10
}

impl StorageConfig {
    /// Tenancy mode derived from `multi_tenant`.
    pub fn tenancy(&self) -> TenancyMode {
        if self.multi_tenant {
            TenancyMode::Multi
        } else {
            TenancyMode::Single
        }
    }

    /// Maximum upload size in bytes, saturating at `u64::MAX`.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            snapshot_file: default_snapshot_file(),
            thumbnail_dir: default_thumbnail_dir(),
            multi_tenant: default_multi_tenant(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Quota configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Storage ceiling per scope, in bytes.
    #[serde(default = "default_limit_bytes")]
    pub limit_bytes: u64,
}

fn default_limit_bytes() -> u64 {
    1024 * 1024 * 1024 // 1GB
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit_bytes: default_limit_bytes(),
        }
    }
}

/// Thumbnail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailConfig {
    /// Whether thumbnails are derived after upload.
    #[serde(default = "default_thumbnail_enabled")]
    pub enabled: bool,
    /// Longest edge of a thumbnail, in pixels.
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
}

fn default_thumbnail_enabled() -> bool {
    true
}

fn default_max_edge() -> u32 {
    300
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: default_thumbnail_enabled(),
            max_edge: default_max_edge(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/picvault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Quota configuration.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Thumbnail configuration.
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PicvaultError::Storage)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PicvaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PICVAULT_STORAGE_PATH`: Override the storage root
    /// - `PICVAULT_QUOTA_LIMIT_BYTES`: Override the quota limit
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PICVAULT_STORAGE_PATH") {
            if !path.is_empty() {
                self.storage.path = path;
            }
        }

        if let Ok(limit) = std::env::var("PICVAULT_QUOTA_LIMIT_BYTES") {
            match limit.trim().parse::<u64>() {
                Ok(limit) => self.quota.limit_bytes = limit,
                Err(_) => {
                    tracing::warn!(value = %limit, "Ignoring invalid PICVAULT_QUOTA_LIMIT_BYTES")
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.path.trim().is_empty() {
            return Err(PicvaultError::Validation(
                "storage.path must not be empty".to_string(),
            ));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(PicvaultError::Validation(
                "storage.max_upload_size_mb must be at least 1".to_string(),
            ));
        }
        if self.quota.limit_bytes == 0 {
            return Err(PicvaultError::Validation(
                "quota.limit_bytes must be at least 1".to_string(),
            ));
        }
        if crate::logging::parse_level(&self.logging.level).is_none() {
            return Err(PicvaultError::Validation(format!(
                "logging.level '{}' is not a known level",
                self.logging.level
            )));
        }
        if self.thumbnail.max_edge == 0 {
            return Err(PicvaultError::Validation(
                "thumbnail.max_edge must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
