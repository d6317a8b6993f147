//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing blobs.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key is empty, absolute or escapes the store root.
    #[error("Invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// No object stored under the key.
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Local file to upload does not exist.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Underlying I/O failure.
    #[error("Storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}
