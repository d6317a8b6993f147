//! Job runner driving one conversion from event key to status record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::converter::{
    CommandBuilder, ConversionInputs, Converter, MetadataMap, ProgressSnapshot, ProgressState,
    Profile, RenderedCommand,
};
use crate::status::{StatusOutcome, StatusStore, StatusUpdate};
use crate::storage::BlobStore;

use super::event::{
    decode_event_key, encode_content_key, parent_prefix, JobEvent, ObjectSuffixes,
};
use super::types::{JobError, JobReport, RecordRef, RECORD_KEYS};

/// Scratch file names of the downloaded inputs.
const METADATA_FILE: &str = "metadata";
const THUMBNAIL_FILE: &str = "thumbnail";
const CONTENT_FILE: &str = "content";

/// Runs conversion jobs against a blob store and a status store.
pub struct JobRunner {
    converter: Arc<dyn Converter>,
    blobs: Arc<dyn BlobStore>,
    status: Arc<dyn StatusStore>,
    builder: CommandBuilder,
    suffixes: ObjectSuffixes,
    scratch_dir: PathBuf,
    output_format: String,
    content_type: String,
    progress_tx: Option<mpsc::Sender<ProgressSnapshot>>,
}

impl JobRunner {
    pub fn new(
        config: &Config,
        converter: Arc<dyn Converter>,
        blobs: Arc<dyn BlobStore>,
        status: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            converter,
            blobs,
            status,
            builder: CommandBuilder::new(&config.converter),
            suffixes: ObjectSuffixes::from(&config.storage),
            scratch_dir: config.converter.scratch_dir.clone(),
            output_format: config.converter.output_format.clone(),
            content_type: config.storage.content_type.clone(),
            progress_tx: None,
        }
    }

    /// Forwards encoder progress snapshots to `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<ProgressSnapshot>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Runs the job triggered by the (possibly percent-encoded) `event_key`.
    ///
    /// The scratch directory is emptied afterwards, whatever the outcome.
    pub async fn run(&self, event_key: &str) -> Result<JobReport, JobError> {
        let job_id = Uuid::new_v4();
        info!(%job_id, event_key, "Starting conversion job");

        let result = self.run_job(job_id, event_key).await;
        match &result {
            Ok(report) => info!(
                %job_id,
                status = %report.status,
                content_key = %report.content_key,
                "Conversion job finished"
            ),
            Err(e) => warn!(%job_id, error = %e, "Conversion job failed"),
        }

        if let Err(e) = empty_dir(&self.scratch_dir).await {
            warn!(%job_id, path = %self.scratch_dir.display(), error = %e, "Failed to clean up scratch directory");
        }
        result
    }

    async fn run_job(&self, job_id: Uuid, raw_key: &str) -> Result<JobReport, JobError> {
        let event_key = decode_event_key(raw_key)?;
        let event = self.parse_event(&event_key).await?;
        info!(
            %job_id,
            prefix = %event.prefix,
            content_key = %event.content_key,
            thumbnail_key = %event.thumbnail_key,
            "Parsed event"
        );

        let metadata_path = self
            .blobs
            .fetch(&event.event_key, &self.scratch_dir.join(METADATA_FILE))
            .await?;
        let thumbnail_path = self
            .blobs
            .fetch(&event.thumbnail_key, &self.scratch_dir.join(THUMBNAIL_FILE))
            .await?;
        let content_path = self
            .blobs
            .fetch(&event.content_key, &self.scratch_dir.join(CONTENT_FILE))
            .await?;
        info!(%job_id, scratch_dir = %self.scratch_dir.display(), "Fetched job inputs");

        let raw_metadata = tokio::fs::read_to_string(&metadata_path).await?;
        let metadata = MetadataMap::from_json(&raw_metadata)?;
        metadata.require(RECORD_KEYS)?;
        let record = RecordRef {
            // Both keys were just checked.
            id: metadata.get("id").unwrap_or_default().to_string(),
            collection: metadata.get("collection_name").unwrap_or_default().to_string(),
        };

        let inputs = ConversionInputs::new(content_path, thumbnail_path);
        match self
            .convert_and_publish(job_id, &event, &metadata, &inputs, &record)
            .await
        {
            Ok(report) => Ok(report),
            Err(e) => {
                self.mark_failed(job_id, &record);
                Err(e)
            }
        }
    }

    async fn parse_event(&self, event_key: &str) -> Result<JobEvent, JobError> {
        let prefix = parent_prefix(event_key);
        let listing_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };
        let keys = self.blobs.list(&listing_prefix).await?;
        debug!(event_key, count = keys.len(), "Listed sibling objects");
        JobEvent::classify(event_key, &keys, &self.suffixes)
    }

    async fn convert_and_publish(
        &self,
        job_id: Uuid,
        event: &JobEvent,
        metadata: &MetadataMap,
        inputs: &ConversionInputs,
        record: &RecordRef,
    ) -> Result<JobReport, JobError> {
        let profile = Profile::from_metadata(metadata)?;
        let command = self.builder.build(inputs, metadata, profile)?.render();
        let title = metadata.get("title").unwrap_or_default();
        let content_key = event.artifact_key(title, &self.output_format);

        let resolved = inputs.resolve()?;
        let duration_secs = self.converter.probe_duration(&resolved.content).await?;
        info!(%job_id, %profile, duration_secs, "Probed source duration");

        let progress = self.execute(&command, duration_secs).await?;
        info!(%job_id, %progress, "Encoder exited cleanly");

        for key in [&event.event_key, &event.content_key] {
            self.blobs.delete(key).await?;
        }
        info!(%job_id, "Deleted consumed objects");

        let artifact = progress
            .output_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.builder.output_path());
        self.blobs
            .put(&content_key, &self.content_type, &artifact)
            .await?;
        info!(%job_id, content_key = %content_key, "Uploaded converted content");

        let outcome = if progress.is_finished() {
            StatusOutcome::Success {
                content_key: encode_content_key(&content_key),
                duration_secs,
            }
        } else {
            warn!(%job_id, "Encoder exited without reporting the end phase");
            StatusOutcome::Failure
        };
        let status = outcome.status();
        self.status.update(&StatusUpdate {
            id: record.id.clone(),
            collection: record.collection.clone(),
            outcome,
        })?;
        info!(%job_id, id = %record.id, collection = %record.collection, %status, "Updated status record");

        Ok(JobReport {
            job_id,
            record: record.clone(),
            content_key,
            duration_secs,
            progress,
            status,
        })
    }

    async fn execute(
        &self,
        command: &RenderedCommand,
        duration_secs: f64,
    ) -> Result<ProgressState, JobError> {
        let state = match &self.progress_tx {
            Some(tx) => {
                self.converter
                    .execute_with_progress(command, duration_secs, tx.clone())
                    .await?
            }
            None => self.converter.execute(command, duration_secs).await?,
        };
        Ok(state)
    }

    /// Marks the record failed; errors are logged, not returned.
    fn mark_failed(&self, job_id: Uuid, record: &RecordRef) {
        let update = StatusUpdate::failure(record.id.clone(), record.collection.clone());
        if let Err(e) = self.status.update(&update) {
            warn!(%job_id, id = %record.id, error = %e, "Failed to mark status record as failed");
        }
    }
}

/// Removes every entry of `dir`, keeping the directory itself.
async fn empty_dir(dir: &Path) -> std::io::Result<()> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
        } else {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}
