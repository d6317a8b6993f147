//! File system blob store implementation.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::error::StorageError;
use super::traits::BlobStore;

/// Directory under the root holding per-object content types.
const META_DIR: &str = ".meta";

/// Blob store backed by a directory tree.
///
/// Key `a/b/c` is stored at `<root>/a/b/c`. Content types recorded by
/// [`BlobStore::put`] live in a sidecar tree under `<root>/.meta`, which is
/// never listed.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Content type recorded for `key`, if it was uploaded through this store.
    pub async fn content_type(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.meta_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content_type) => Ok(Some(content_type)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    /// Maps a key to its file path, rejecting keys that escape the root.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::invalid_key(key, "key is empty"));
        }
        if key.starts_with('/') {
            return Err(StorageError::invalid_key(key, "key is absolute"));
        }

        let mut path = self.root.clone();
        for segment in key.split('/') {
            match segment {
                "" => return Err(StorageError::invalid_key(key, "empty path segment")),
                "." | ".." => {
                    return Err(StorageError::invalid_key(key, "relative path segment"))
                }
                _ => path.push(segment),
            }
        }

        // Catches platform-specific prefixes a plain split would miss.
        let relative = path.strip_prefix(&self.root).unwrap_or(path.as_path());
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::invalid_key(key, "key escapes the store root"));
        }
        if relative.starts_with(META_DIR) {
            return Err(StorageError::invalid_key(key, "reserved prefix"));
        }

        Ok(path)
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let object = self.object_path(key)?;
        let relative = object.strip_prefix(&self.root).unwrap_or(object.as_path());
        Ok(self.root.join(META_DIR).join(relative))
    }

    /// Removes now-empty directories between `path` and the root.
    async fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    async fn copy_file(key: &str, source: &Path, destination: &Path) -> Result<u64, StorageError> {
        let source_file = File::open(source)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        let dest_file = File::create(destination)
            .await
            .map_err(|e| StorageError::io(key, e))?;

        let mut reader = BufReader::new(source_file);
        let mut writer = BufWriter::new(dest_file);
        let bytes = tokio::io::copy_buf(&mut reader, &mut writer)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        writer.flush().await.map_err(|e| StorageError::io(key, e))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Ok(bytes)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, dir_key)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(prefix, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io(prefix, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                if dir_key.is_empty() && name == META_DIR {
                    continue;
                }
                let key = if dir_key.is_empty() {
                    name
                } else {
                    format!("{}/{}", dir_key, name)
                };

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::io(&key, e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        debug!(prefix, count = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn fetch(&self, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        let source = self.object_path(key)?;
        if !fs::try_exists(&source)
            .await
            .map_err(|e| StorageError::io(key, e))?
        {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }

        let bytes = Self::copy_file(key, &source, dest).await?;
        debug!(key, dest = %dest.display(), bytes, "Fetched object");
        Ok(dest.to_path_buf())
    }

    async fn put(&self, key: &str, content_type: &str, source: &Path) -> Result<(), StorageError> {
        let destination = self.object_path(key)?;
        if !fs::try_exists(source)
            .await
            .map_err(|e| StorageError::io(key, e))?
        {
            return Err(StorageError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let meta = self.meta_path(key)?;
        for dir in [destination.parent(), meta.parent()].into_iter().flatten() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }

        let bytes = Self::copy_file(key, source, &destination).await?;
        fs::write(&meta, content_type)
            .await
            .map_err(|e| StorageError::io(key, e))?;

        debug!(key, content_type, bytes, "Stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(StorageError::io(key, e)),
        }

        let meta = self.meta_path(key)?;
        if fs::remove_file(&meta).await.is_ok() {
            self.prune_empty_parents(&meta).await;
        }
        self.prune_empty_parents(&path).await;

        debug!(key, "Deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded_store(dir: &TempDir) -> FsBlobStore {
        let root = dir.path().join("blobs");
        for (key, body) in [
            ("shows/ep1/meta.json", "{}"),
            ("shows/ep1/ep1_thumbnail", "png"),
            ("shows/ep1/ep1_content", "flac"),
            ("shows/ep10/other", "x"),
        ] {
            let path = root.join(key);
            fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            fs::write(&path, body).await.unwrap();
        }
        FsBlobStore::new(root)
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_sorted() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;

        let keys = store.list("shows/ep1/").await.unwrap();
        assert_eq!(
            keys,
            [
                "shows/ep1/ep1_content",
                "shows/ep1/ep1_thumbnail",
                "shows/ep1/meta.json"
            ]
        );

        // Plain string prefix, like an object store.
        assert_eq!(store.list("shows/ep1").await.unwrap().len(), 4);
        assert!(store.list("movies/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("nothing"));
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let dest = dir.path().join("work").join("nested").join("content");

        let path = store.fetch("shows/ep1/ep1_content", &dest).await.unwrap();

        assert_eq!(path, dest);
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "flac");
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;

        let err = store
            .fetch("shows/ep1/missing", &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { key } if key == "shows/ep1/missing"));
    }

    #[tokio::test]
    async fn test_put_records_content_type_and_hides_it_from_listing() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let source = dir.path().join("processed_file.m4a");
        fs::write(&source, "aac").await.unwrap();

        store
            .put("shows/ep1/Episode One.m4a", "audio/mp4", &source)
            .await
            .unwrap();

        assert_eq!(
            store
                .content_type("shows/ep1/Episode One.m4a")
                .await
                .unwrap()
                .as_deref(),
            Some("audio/mp4")
        );
        let keys = store.list("").await.unwrap();
        assert!(keys.contains(&"shows/ep1/Episode One.m4a".to_string()));
        assert!(keys.iter().all(|k| !k.starts_with(META_DIR)));
    }

    #[tokio::test]
    async fn test_put_missing_source() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;

        let err = store
            .put("a/b", "audio/mp4", &dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_directories() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;

        store.delete("shows/ep10/other").await.unwrap();

        assert!(!store.root().join("shows/ep10").exists());
        assert!(store.root().join("shows/ep1").exists());
        assert!(matches!(
            store.delete("shows/ep10/other").await.unwrap_err(),
            StorageError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_keys() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let dest = dir.path().join("out");

        for key in ["", "/etc/passwd", "shows/../../secret", "shows//x", "shows/ep1/", ".meta/x"] {
            let err = store.fetch(key, &dest).await.unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { .. }),
                "key {key:?} gave {err:?}"
            );
        }
    }
}
