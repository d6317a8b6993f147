//! Types for the job module.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::converter::{ConverterError, InputRole, ProgressState};
use crate::status::{ConversionStatus, StatusError};
use crate::storage::StorageError;

/// Metadata keys identifying the status record of a job.
pub const RECORD_KEYS: [&str; 3] = ["id", "title", "collection_name"];

/// Errors that can occur while running a conversion job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The event key could not be decoded.
    #[error("Invalid event key {key:?}: {reason}")]
    InvalidEventKey { key: String, reason: String },

    /// No object with this role next to the event key.
    #[error("No {role} object found next to the event key")]
    MissingObject { role: InputRole },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Converter(#[from] ConverterError),

    #[error(transparent)]
    Status(#[from] StatusError),

    /// Local I/O error in the scratch directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The status record a job reports to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub id: String,
    pub collection: String,
}

/// Summary of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Correlates the job's log lines.
    pub job_id: Uuid,
    pub record: RecordRef,
    /// Key the converted artifact was uploaded under.
    pub content_key: String,
    /// Probed source duration.
    pub duration_secs: f64,
    /// Final encoder progress.
    pub progress: ProgressState,
    /// Status written to the record.
    pub status: ConversionStatus,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}
