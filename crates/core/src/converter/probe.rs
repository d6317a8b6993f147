//! Source duration probing through ffprobe.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::command::RenderedCommand;
use super::config::ConverterConfig;
use super::error::ConverterError;

/// Runs ffprobe under a short deadline to read a file's duration.
#[derive(Debug, Clone)]
pub struct DurationProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl DurationProber {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: config.probe_timeout(),
        }
    }

    /// The ffprobe invocation printing only the container duration.
    pub fn command(&self, path: &Path) -> RenderedCommand {
        RenderedCommand::from_args([
            self.ffprobe_path.to_string_lossy().to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().to_string(),
        ])
    }

    /// Returns the duration of `path` in seconds.
    ///
    /// A zero or negative duration is returned as-is.
    pub async fn probe(&self, path: &Path) -> Result<f64, ConverterError> {
        self.run(&self.command(path), path).await
    }

    async fn run(&self, command: &RenderedCommand, path: &Path) -> Result<f64, ConverterError> {
        let program = command.program().ok_or(ConverterError::EmptyCommand)?;

        let child = Command::new(program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConverterError::probe_failed(
                    path,
                    format!("ffprobe not found at {}", program),
                ))
            }
            Ok(Err(e)) => return Err(ConverterError::probe_failed(path, e.to_string())),
            Err(_) => {
                return Err(ConverterError::probe_failed(
                    path,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        if !output.status.success() {
            return Err(ConverterError::probe_failed(
                path,
                format!(
                    "ffprobe exited with code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let duration = parse_duration_output(&String::from_utf8_lossy(&output.stdout))
            .map_err(|reason| ConverterError::probe_failed(path, reason))?;
        debug!(path = %path.display(), duration, "Probed duration");
        Ok(duration)
    }
}

/// Parses the single number printed by ffprobe, ignoring surrounding whitespace.
pub fn parse_duration_output(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|e| format!("failed to parse duration {:?}: {}", trimmed, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober(timeout_secs: u64) -> DurationProber {
        DurationProber::new(&ConverterConfig::default().with_probe_timeout(timeout_secs))
    }

    fn sh(script: &str) -> RenderedCommand {
        RenderedCommand::from_args(["sh", "-c", script])
    }

    #[test]
    fn test_parse_duration_output() {
        assert_eq!(parse_duration_output("183.520000\n").unwrap(), 183.52);
        assert_eq!(parse_duration_output("  42\r\n").unwrap(), 42.0);
        assert_eq!(parse_duration_output("-1.5\n").unwrap(), -1.5);
        assert!(parse_duration_output("N/A\n").is_err());
        assert!(parse_duration_output("").is_err());
    }

    #[test]
    fn test_command_shape() {
        let command = prober(2).command(Path::new("/work/content"));
        assert_eq!(command.program(), Some("ffprobe"));
        assert_eq!(command.output_path(), Some(Path::new("/work/content")));
        assert!(command
            .args()
            .contains(&"default=noprint_wrappers=1:nokey=1".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_reads_stdout() {
        let duration = prober(5)
            .run(&sh("printf '183.52\\n'"), Path::new("song.flac"))
            .await
            .unwrap();
        assert_eq!(duration, 183.52);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_accepts_zero_duration() {
        let duration = prober(5)
            .run(&sh("echo 0.000000"), Path::new("song.flac"))
            .await
            .unwrap();
        assert_eq!(duration, 0.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_non_numeric_output_fails() {
        let err = prober(5)
            .run(&sh("echo N/A"), Path::new("song.flac"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ProbeFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_non_zero_exit_fails() {
        let err = prober(5)
            .run(&sh("echo 'No such file' >&2; exit 1"), Path::new("missing.flac"))
            .await
            .unwrap_err();
        match err {
            ConverterError::ProbeFailed { path, reason } => {
                assert_eq!(path, PathBuf::from("missing.flac"));
                assert!(reason.contains("No such file"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_times_out() {
        let err = prober(1)
            .run(&sh("sleep 10; echo 1.0"), Path::new("slow.flac"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConverterError::ProbeFailed { ref reason, .. } if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_binary_fails() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        );
        let err = DurationProber::new(&config)
            .probe(Path::new("song.flac"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ProbeFailed { .. }));
    }
}
