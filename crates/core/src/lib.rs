pub mod config;
pub mod converter;
pub mod job;
pub mod status;
pub mod storage;
pub mod testing;

pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
    DatabaseConfig, StorageConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter};
pub use job::{JobError, JobReport, JobRunner};
pub use status::{SqliteStatusStore, StatusError, StatusStore};
pub use storage::{BlobStore, FsBlobStore, StorageError};
