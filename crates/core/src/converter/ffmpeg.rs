//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;

use super::command::{CommandBuilder, RenderedCommand};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::executor::Executor;
use super::probe::DurationProber;
use super::traits::Converter;
use super::types::{ProgressSnapshot, ProgressState};

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    prober: DurationProber,
    executor: Executor,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let prober = DurationProber::new(&config);
        let executor = Executor::new(&config);
        Self {
            config,
            prober,
            executor,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// A command builder writing into this converter's scratch directory.
    pub fn command_builder(&self) -> CommandBuilder {
        CommandBuilder::new(&self.config)
    }

    /// Checks that `binary -version` can be spawned.
    async fn check_binary(binary: &Path) -> Result<bool, std::io::Error> {
        match Command::new(binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, ConverterError> {
        self.prober.probe(path).await
    }

    async fn execute(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
    ) -> Result<ProgressState, ConverterError> {
        self.executor.execute(command, duration_secs).await
    }

    async fn execute_with_progress(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<ProgressState, ConverterError> {
        self.executor
            .execute_with_progress(command, duration_secs, progress_tx)
            .await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if !Self::check_binary(&self.config.ffmpeg_path).await? {
            return Err(ConverterError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            });
        }

        if !Self::check_binary(&self.config.ffprobe_path).await? {
            return Err(ConverterError::FfprobeNotFound {
                path: self.config.ffprobe_path.clone(),
            });
        }

        // Ensure scratch dir exists
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConversionInputs, MetadataMap, Profile};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_validate_reports_missing_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let converter = FfmpegConverter::new(
            ConverterConfig::with_paths(
                PathBuf::from("/nonexistent/ffmpeg"),
                PathBuf::from("/nonexistent/ffprobe"),
            )
            .with_scratch_dir(dir.path().join("scratch")),
        );

        let err = converter.validate().await.unwrap_err();
        assert!(matches!(err, ConverterError::FfmpegNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_reports_missing_ffprobe() {
        let dir = TempDir::new().unwrap();
        let converter = FfmpegConverter::new(
            ConverterConfig::with_paths(PathBuf::from("true"), PathBuf::from("/nonexistent/ffprobe"))
                .with_scratch_dir(dir.path().join("scratch")),
        );

        let err = converter.validate().await.unwrap_err();
        assert!(matches!(err, ConverterError::FfprobeNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_creates_scratch_dir() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");
        let converter = FfmpegConverter::new(
            ConverterConfig::with_paths(PathBuf::from("true"), PathBuf::from("true"))
                .with_scratch_dir(scratch.clone()),
        );

        converter.validate().await.unwrap();
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_command_builder_uses_converter_config() {
        let converter = FfmpegConverter::new(
            ConverterConfig::default()
                .with_scratch_dir(PathBuf::from("/scratch"))
                .with_output("libopus", "ogg"),
        );
        let metadata: MetadataMap = [
            ("title", "t"),
            ("year", "1999"),
            ("presenter", "p"),
            ("description", "d"),
        ]
        .into_iter()
        .collect();

        let rendered = converter
            .command_builder()
            .build(
                &ConversionInputs::new("/scratch/content", "/scratch/thumbnail"),
                &metadata,
                Profile::Podcast,
            )
            .unwrap()
            .render();

        assert_eq!(rendered.program(), Some("ffmpeg"));
        assert!(rendered.as_slice().contains(&"libopus".to_string()));
        assert_eq!(
            rendered.output_path(),
            Some(Path::new("/scratch/processed_file.ogg"))
        );
    }
}
