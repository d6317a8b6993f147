use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagline_core::converter::ProgressSnapshot;
use tagline_core::{
    config_path, load_config, validate_config, BlobStore, Converter, FfmpegConverter,
    FsBlobStore, JobRunner, SqliteStatusStore, StatusStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable switching log output to JSON
const LOG_JSON_ENV: &str = "TAGLINE_LOG_JSON";

/// Buffer size for the progress channel
const PROGRESS_BUFFER_SIZE: usize = 64;

/// Progress is logged each time it crosses a multiple of this percentage
const PROGRESS_LOG_STEP: f64 = 25.0;

#[tokio::main]
async fn main() {
    init_logging(json_logging(std::env::var(LOG_JSON_ENV).ok().as_deref()));

    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn json_logging(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

/// The event key is the only positional argument.
fn event_key_from_args<I: IntoIterator<Item = String>>(args: I) -> Result<String> {
    let mut args = args.into_iter().skip(1);
    match (args.next(), args.next()) {
        (Some(key), None) if !key.trim().is_empty() => Ok(key),
        _ => bail!("usage: tagline <event-key>"),
    }
}

/// Logs progress each time it crosses a step, returning how many lines were logged.
async fn log_progress(mut progress_rx: mpsc::Receiver<ProgressSnapshot>) -> usize {
    let mut next_step = PROGRESS_LOG_STEP;
    let mut logged = 0;
    while let Some(snapshot) = progress_rx.recv().await {
        if snapshot.percent >= next_step || snapshot.finished {
            info!(percent = snapshot.percent, "Conversion progress");
            logged += 1;
            next_step =
                (snapshot.percent / PROGRESS_LOG_STEP).floor() * PROGRESS_LOG_STEP + PROGRESS_LOG_STEP;
        }
    }
    logged
}

async fn run() -> Result<()> {
    let event_key = event_key_from_args(std::env::args())?;
    info!("Starting tagline worker v{}", VERSION);

    // Determine config path
    let config_path = config_path();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Storage root: {:?}", config.storage.root);
    info!("Database path: {:?}", config.database.path);

    let converter = FfmpegConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .context("Converter validation failed")?;
    let converter: Arc<dyn Converter> = Arc::new(converter);

    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.storage.root.clone()));

    let status_store = Arc::new(
        SqliteStatusStore::open(&config.database.path).context("Failed to open status store")?,
    );

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressSnapshot>(PROGRESS_BUFFER_SIZE);
    let progress_logger = tokio::spawn(log_progress(progress_rx));

    let runner = JobRunner::new(
        &config,
        converter,
        blobs,
        status_store.clone() as Arc<dyn StatusStore>,
    )
    .with_progress(progress_tx);

    let result = runner.run(&event_key).await;

    // Dropping the runner closes the progress channel
    drop(runner);
    match progress_logger.await {
        Ok(logged) => info!(logged, "Progress logger stopped"),
        Err(e) => warn!("Progress logger stopped abnormally: {}", e),
    }

    match Arc::try_unwrap(status_store) {
        Ok(store) => store.close().context("Failed to close status store")?,
        Err(_) => warn!("Status store still in use, leaving it to be dropped"),
    }

    let report = result.context("Conversion job failed")?;
    if !report.is_success() {
        bail!(
            "Conversion of {} did not finish; record {} marked as {}",
            event_key,
            report.record.id,
            report.status
        );
    }

    info!(
        "Converted {} to {} in {:?}",
        event_key,
        report.content_key,
        report.progress.wall_clock().unwrap_or_default()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_event_key_from_args() {
        assert_eq!(
            event_key_from_args(args(&["tagline", "shows/ep1/meta.json"])).unwrap(),
            "shows/ep1/meta.json"
        );
        assert!(event_key_from_args(args(&["tagline"])).is_err());
        assert!(event_key_from_args(args(&["tagline", " "])).is_err());
        assert!(event_key_from_args(args(&["tagline", "a", "b"])).is_err());
    }

    fn snapshot(percent: f64, finished: bool) -> ProgressSnapshot {
        ProgressSnapshot {
            percent,
            current_secs: percent,
            duration_secs: 100.0,
            finished,
        }
    }

    #[tokio::test]
    async fn test_log_progress_logs_each_step() {
        let (tx, rx) = mpsc::channel::<ProgressSnapshot>(PROGRESS_BUFFER_SIZE);
        let logger = tokio::spawn(log_progress(rx));

        for (percent, finished) in [
            (10.0, false),
            (26.0, false),
            (30.0, false),
            (80.0, false),
            (100.0, false),
            (100.0, true),
        ] {
            tx.send(snapshot(percent, finished)).await.unwrap();
        }
        drop(tx);

        // 26, 80, 100 and the final snapshot
        assert_eq!(logger.await.unwrap(), 4);
    }

    #[test]
    fn test_json_logging_flag() {
        assert!(json_logging(Some("1")));
        assert!(json_logging(Some("TRUE")));
        assert!(!json_logging(Some("0")));
        assert!(!json_logging(None));
    }
}
