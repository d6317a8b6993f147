//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::command::RenderedCommand;
use super::error::ConverterError;
use super::types::{ProgressSnapshot, ProgressState};

/// A converter that probes sources and runs rendered encoder commands.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Returns the duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, ConverterError>;

    /// Runs a rendered command to completion.
    async fn execute(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
    ) -> Result<ProgressState, ConverterError>;

    /// Runs a rendered command with progress reporting.
    ///
    /// The progress sender will receive updates during conversion.
    /// If the sender is dropped, conversion continues without progress reporting.
    async fn execute_with_progress(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<ProgressState, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
