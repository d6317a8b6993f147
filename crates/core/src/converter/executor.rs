//! Encoder execution under a deadline with progress tracking.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::command::RenderedCommand;
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::progress::{progress_lines, track};
use super::types::{ProgressSnapshot, ProgressState};

/// Stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// Runs one encoder process and follows its `-progress pipe:1` output.
#[derive(Debug, Clone)]
pub struct Executor {
    working_dir: PathBuf,
    timeout: Duration,
}

impl Executor {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            working_dir: config.scratch_dir.clone(),
            timeout: config.timeout(),
        }
    }

    /// Runs `command` for a source of `duration_secs` seconds.
    pub async fn execute(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
    ) -> Result<ProgressState, ConverterError> {
        self.run(command, duration_secs, None).await
    }

    /// Like [`Executor::execute`], offering a snapshot to `progress_tx` on every change.
    pub async fn execute_with_progress(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<ProgressState, ConverterError> {
        self.run(command, duration_secs, Some(progress_tx)).await
    }

    async fn run(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
        progress_tx: Option<mpsc::Sender<ProgressSnapshot>>,
    ) -> Result<ProgressState, ConverterError> {
        let start = Instant::now();
        let (program, output_path) = match (command.program(), command.output_path()) {
            (Some(program), Some(output)) => (program, output.to_path_buf()),
            _ => return Err(ConverterError::EmptyCommand),
        };

        tokio::fs::create_dir_all(&self.working_dir).await?;

        let mut state = ProgressState::new(duration_secs);
        debug!(%command, "Spawning encoder");

        let mut child = Command::new(program)
            .args(command.args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: PathBuf::from(program),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("encoder stdout was not captured"))?;
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, STDERR_TAIL_LINES)));

        let result = timeout(self.timeout, async {
            track(progress_lines(stdout), &mut state, progress_tx.as_ref()).await?;
            child.wait().await
        })
        .await;

        match result {
            Ok(Ok(status)) => {
                let stderr = match stderr_task {
                    Some(task) => task.await.ok().filter(|s| !s.is_empty()),
                    None => None,
                };
                if !status.success() {
                    warn!(code = ?status.code(), progress = %state, "Encoder exited abnormally");
                    return Err(ConverterError::execution_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        stderr,
                        state,
                    ));
                }
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                if let Some(task) = stderr_task {
                    task.abort();
                }
                return Err(ConverterError::execution_failed(
                    format!("failed to read encoder output: {}", e),
                    None,
                    state,
                ));
            }
            Err(_) => {
                // kill() also waits, so the process is reaped before returning.
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out encoder");
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }
                warn!(timeout_secs = self.timeout.as_secs(), progress = %state, "Encoder timed out");
                return Err(ConverterError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                    state: Box::new(state),
                });
            }
        }

        state.complete(start.elapsed(), output_path);
        info!(
            percent = state.percent(),
            finished = state.is_finished(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Encoder finished"
        );
        Ok(state)
    }
}

/// Reads `reader` to the end, keeping the last `limit` lines.
async fn collect_tail<R>(reader: R, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::with_capacity(limit);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn executor(dir: &TempDir, timeout_secs: u64) -> Executor {
        let config = ConverterConfig::default()
            .with_scratch_dir(dir.path().join("scratch"))
            .with_timeout(timeout_secs);
        Executor::new(&config)
    }

    /// `sh -c script output`; the shell sees `output` as `$0`.
    fn sh(script: &str, output: &str) -> RenderedCommand {
        RenderedCommand::from_args(["sh", "-c", script, output])
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = executor(&dir, 5)
            .execute(&RenderedCommand::from_args(Vec::<String>::new()), 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = TempDir::new().unwrap();
        let err = executor(&dir, 5)
            .execute(
                &RenderedCommand::from_args(["/nonexistent/ffmpeg", "out.m4a"]),
                10.0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::FfmpegNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_run_sets_output_and_wall_clock() {
        let dir = TempDir::new().unwrap();
        let script = "printf 'out_time=00:00:30.000000\\nprogress=continue\\n\\n\
                      out_time=00:01:00.000000\\nprogress=end\\n'";
        let state = executor(&dir, 10)
            .execute(&sh(script, "/work/processed_file.m4a"), 60.0)
            .await
            .unwrap();

        assert!(state.is_finished());
        assert_eq!(state.percent(), 100.0);
        assert_eq!(
            state.output_path(),
            Some(Path::new("/work/processed_file.m4a"))
        );
        assert!(state.wall_clock().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_inside_scratch_dir() {
        let dir = TempDir::new().unwrap();
        let state = executor(&dir, 10)
            .execute(&sh("touch marker; echo progress=end", "out"), 1.0)
            .await
            .unwrap();

        assert!(state.is_finished());
        assert!(dir.path().join("scratch").join("marker").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit_without_end_phase_is_not_finished() {
        let dir = TempDir::new().unwrap();
        let state = executor(&dir, 10)
            .execute(&sh("echo out_time=00:00:05.000000", "out"), 10.0)
            .await
            .unwrap();

        assert!(!state.is_finished());
        assert_eq!(state.percent(), 50.0);
        assert!(state.output_path().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abnormal_exit_returns_partial_state() {
        let dir = TempDir::new().unwrap();
        let script = "echo out_time=00:00:05.000000; echo progress=end; \
                      echo 'Conversion failed!' >&2; exit 3";
        let err = executor(&dir, 10)
            .execute(&sh(script, "out"), 10.0)
            .await
            .unwrap_err();

        match err {
            ConverterError::ExecutionFailed {
                reason,
                stderr,
                state,
            } => {
                assert!(reason.contains("3"));
                assert_eq!(stderr.as_deref(), Some("Conversion failed!"));
                assert!(state.is_finished());
                assert_eq!(state.percent(), 50.0);
                assert!(state.output_path().is_none());
                assert!(state.wall_clock().is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_kills_encoder() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("encoder.pid");
        let script = format!(
            "echo $$ > '{}'; echo out_time=00:00:01.000000; exec sleep 30",
            pid_file.display()
        );

        let started = Instant::now();
        let err = executor(&dir, 1)
            .execute(&sh(&script, "out"), 10.0)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));

        match &err {
            ConverterError::Timeout { timeout_secs, state } => {
                assert_eq!(*timeout_secs, 1);
                assert_eq!(state.percent(), 10.0);
                assert!(!state.is_finished());
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "encoder process still running");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_progress_channel_receives_updates() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let script = "echo out_time=00:00:02.000000; echo out_time=00:00:04.000000; \
                      echo progress=end";
        executor(&dir, 10)
            .execute_with_progress(&sh(script, "out"), 4.0, tx)
            .await
            .unwrap();

        let mut last = None;
        while let Some(snapshot) = rx.recv().await {
            last = Some(snapshot);
        }
        let last = last.unwrap();
        assert!(last.finished);
        assert_eq!(last.percent, 100.0);
    }
}
