//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::ProgressState;

/// Errors that can occur while building, probing or executing a conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// A required metadata key is absent or empty.
    #[error("Required metadata key '{key}' is missing or empty")]
    MissingMetadata { key: String },

    /// The metadata document could not be turned into a flat string map.
    #[error("Invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    /// The metadata `type` does not name a known profile.
    #[error("Unknown profile: {name:?}")]
    UnknownProfile { name: String },

    /// An input path is empty or cannot be made absolute.
    #[error("Invalid path for {role}: {reason}")]
    InvalidPath { role: String, reason: String },

    /// The command has no elements to run.
    #[error("Command is empty")]
    EmptyCommand,

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Duration probe failed, timed out or produced non-numeric output.
    #[error("Failed to probe duration of {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    /// Encoder exceeded its deadline and was killed.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout {
        timeout_secs: u64,
        state: Box<ProgressState>,
    },

    /// Encoder exited abnormally.
    #[error("Conversion failed: {reason}")]
    ExecutionFailed {
        reason: String,
        stderr: Option<String>,
        state: Box<ProgressState>,
    },

    /// I/O error while driving the external process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a missing metadata error for `key`.
    pub fn missing_metadata(key: impl Into<String>) -> Self {
        Self::MissingMetadata { key: key.into() }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            role: role.into(),
            reason: reason.into(),
        }
    }

    /// Creates a probe failed error.
    pub fn probe_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an execution failed error carrying the partial progress.
    pub fn execution_failed(
        reason: impl Into<String>,
        stderr: Option<String>,
        state: ProgressState,
    ) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
            stderr,
            state: Box::new(state),
        }
    }

    /// Progress reached before the failure, when the encoder had been started.
    pub fn progress_state(&self) -> Option<&ProgressState> {
        match self {
            Self::Timeout { state, .. } | Self::ExecutionFailed { state, .. } => Some(state),
            _ => None,
        }
    }
}
