use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory backing the filesystem blob store
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Suffix marking the original audio upload
    #[serde(default = "default_content_suffix")]
    pub content_suffix: String,
    /// Suffix marking the cover image upload
    #[serde(default = "default_thumbnail_suffix")]
    pub thumbnail_suffix: String,
    /// Content type recorded with uploaded artifacts
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            content_suffix: default_content_suffix(),
            thumbnail_suffix: default_thumbnail_suffix(),
            content_type: default_content_type(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./blobs")
}

fn default_content_suffix() -> String {
    "_content".to_string()
}

fn default_thumbnail_suffix() -> String {
    "_thumbnail".to_string()
}

fn default_content_type() -> String {
    "audio/mp4".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tagline.db")
}
