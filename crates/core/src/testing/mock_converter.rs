//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    format_seconds, track, Converter, ConverterError, ProgressSnapshot, ProgressState,
    RenderedCommand,
};

/// A recorded execution for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    /// The command that was submitted.
    pub command: RenderedCommand,
    /// Duration the command was run against.
    pub duration_secs: f64,
    /// Whether the execution succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track executed commands for assertions
/// - Simulate failures, once per injected error
/// - Control probed durations
/// - Replay canned progress output
///
/// A successful execution writes a small file at the command's output path,
/// so callers that upload the artifact have something to read.
///
/// # Example
///
/// ```rust,ignore
/// use tagline_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_default_duration(60.0).await;
/// converter
///     .set_progress_lines(["out_time=00:00:30.000000", "progress=end"])
///     .await;
///
/// let state = converter.execute(&command, 60.0).await?;
/// assert_eq!(state.percent(), 50.0);
/// assert_eq!(converter.execution_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded executions.
    executions: Arc<RwLock<Vec<RecordedExecution>>>,
    /// Pre-configured durations by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, f64>>>,
    /// Duration returned for paths without a configured result.
    default_duration: Arc<RwLock<f64>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Lines replayed as encoder output; `None` replays a complete run.
    progress_lines: Arc<RwLock<Option<Vec<String>>>>,
    /// Bytes written to the output path on success.
    output_bytes: Arc<RwLock<Vec<u8>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            executions: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            default_duration: Arc::new(RwLock::new(180.0)),
            next_error: Arc::new(RwLock::new(None)),
            progress_lines: Arc::new(RwLock::new(None)),
            output_bytes: Arc::new(RwLock::new(b"mock encoded audio".to_vec())),
        }
    }

    /// Get all recorded executions.
    pub async fn recorded_executions(&self) -> Vec<RecordedExecution> {
        self.executions.read().await.clone()
    }

    /// Get the number of executions performed.
    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, duration_secs: f64) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), duration_secs);
    }

    /// Set the duration returned for unknown paths.
    pub async fn set_default_duration(&self, duration_secs: f64) {
        *self.default_duration.write().await = duration_secs;
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Replace the replayed encoder output.
    pub async fn set_progress_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.progress_lines.write().await = Some(lines.into_iter().map(Into::into).collect());
    }

    /// Set the bytes written as the encoded artifact.
    pub async fn set_output_bytes(&self, bytes: impl Into<Vec<u8>>) {
        *self.output_bytes.write().await = bytes.into();
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn lines_for(&self, duration_secs: f64) -> Vec<String> {
        match self.progress_lines.read().await.as_ref() {
            Some(lines) => lines.clone(),
            None => vec![
                format!("out_time={}.000000", format_seconds(duration_secs)),
                "progress=end".to_string(),
            ],
        }
    }

    async fn run(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: Option<mpsc::Sender<ProgressSnapshot>>,
    ) -> Result<ProgressState, ConverterError> {
        if let Some(err) = self.take_error().await {
            self.record(command, duration_secs, false).await;
            return Err(err);
        }

        let output = command
            .output_path()
            .map(Path::to_path_buf)
            .ok_or(ConverterError::EmptyCommand)?;

        let mut state = ProgressState::new(duration_secs);
        let lines = self.lines_for(duration_secs).await;
        track(
            futures::stream::iter(lines.into_iter().map(Ok)),
            &mut state,
            progress_tx.as_ref(),
        )
        .await?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = self.output_bytes.read().await.clone();
        tokio::fs::write(&output, bytes).await?;

        state.complete(Duration::ZERO, output);
        self.record(command, duration_secs, true).await;
        Ok(state)
    }

    async fn record(&self, command: &RenderedCommand, duration_secs: f64, success: bool) {
        self.executions.write().await.push(RecordedExecution {
            command: command.clone(),
            duration_secs,
            success,
        });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        // Check for pre-configured result
        if let Some(duration) = self.probe_results.read().await.get(path) {
            return Ok(*duration);
        }

        Ok(*self.default_duration.read().await)
    }

    async fn execute(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
    ) -> Result<ProgressState, ConverterError> {
        self.run(command, duration_secs, None).await
    }

    async fn execute_with_progress(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<ProgressState, ConverterError> {
        self.run(command, duration_secs, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
