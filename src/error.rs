//! Error types for picvault.

use thiserror::Error;

/// Common error type for picvault.
#[derive(Error, Debug)]
pub enum PicvaultError {
    /// Upload content is not one of the accepted image types.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Committing the upload would exceed the scope's storage limit.
    #[error("quota exceeded: {requested} bytes requested, {used} of {limit} bytes used")]
    QuotaExceeded {
        /// Size of the rejected upload.
        requested: u64,
        /// Bytes already used in the scope.
        used: u64,
        /// Configured limit for the scope.
        limit: u64,
    },

    /// Resource not found.
    ///
    /// Also returned for records owned by another account, so callers cannot
    /// discover other accounts' objects.
    #[error("{0} not found")]
    NotFound(String),

    /// Filesystem error while creating, writing, renaming or removing files.
    #[error("storage I/O error: {0}")]
    Storage(#[from] std::io::Error),

    /// Metadata snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for PicvaultError {
    fn from(e: serde_json::Error) -> Self {
        PicvaultError::Snapshot(e.to_string())
    }
}

/// Result type alias for picvault operations.
pub type Result<T> = std::result::Result<T, PicvaultError>;
