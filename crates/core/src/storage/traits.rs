//! Trait definitions for the storage module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::StorageError;

/// An object store holding job inputs and converted artifacts.
///
/// Keys are `/`-separated; a key's "directory" is everything before its
/// last `/`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Lists every key starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Downloads `key` into the local file `dest`, creating parent directories.
    async fn fetch(&self, key: &str, dest: &Path) -> Result<PathBuf, StorageError>;

    /// Uploads the local file `source` under `key`, replacing any existing object.
    async fn put(&self, key: &str, content_type: &str, source: &Path) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
