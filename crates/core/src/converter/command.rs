//! Structured FFmpeg command for muxing an audio stream with cover art.
//!
//! FFmpeg resolves stream indices and filters positionally, so the argument
//! groups of a [`FfmpegCommand`] are always rendered in [`GroupKind::ORDER`],
//! regardless of the order in which they were filled in.

use std::fmt;
use std::path::{Path, PathBuf};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::metadata::{MetadataMap, REQUIRED_METADATA_KEYS};
use super::profile::Profile;
use super::types::ConversionInputs;

/// Base name of the produced file inside the scratch directory.
pub const OUTPUT_BASE_NAME: &str = "processed_file";

/// Rounds both image dimensions down to even numbers.
pub const EVEN_SCALE_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Argument group of an encoder command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    GlobalOptions,
    Inputs,
    Filter,
    StreamMap,
    Codec,
    Metadata,
    Flags,
    Output,
}

impl GroupKind {
    /// Render order of the groups.
    pub const ORDER: [GroupKind; 8] = [
        GroupKind::GlobalOptions,
        GroupKind::Inputs,
        GroupKind::Filter,
        GroupKind::StreamMap,
        GroupKind::Codec,
        GroupKind::Metadata,
        GroupKind::Flags,
        GroupKind::Output,
    ];
}

/// Where a metadata tag is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScope {
    /// Container-level tag.
    Global,
    /// Tag on the video (cover art) stream.
    VideoStream,
}

impl TagScope {
    fn flag(&self) -> &'static str {
        match self {
            Self::Global => "-metadata",
            Self::VideoStream => "-metadata:s:v",
        }
    }
}

/// One `key=value` metadata tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    pub scope: TagScope,
    pub key: String,
    pub value: String,
}

impl MetadataTag {
    pub fn global(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scope: TagScope::Global,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn video_stream(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scope: TagScope::VideoStream,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Encoder command split into its argument groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    binary: PathBuf,
    inputs: Vec<PathBuf>,
    video_filter: String,
    stream_maps: Vec<String>,
    audio_codec: String,
    tags: Vec<MetadataTag>,
    movflags: String,
    output: PathBuf,
}

impl FfmpegCommand {
    /// Path the encoder will write to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Metadata tags in render order.
    pub fn tags(&self) -> &[MetadataTag] {
        &self.tags
    }

    /// Appends a global tag for every key in `keys` that is present and non-empty.
    pub fn add_tags_from(&mut self, keys: &[&str], metadata: &MetadataMap) {
        for key in keys {
            if let Some(value) = metadata.non_empty(key) {
                self.tags.push(MetadataTag::global(*key, value));
            }
        }
    }

    /// Renders a single group.
    pub fn group(&self, kind: GroupKind) -> Vec<String> {
        match kind {
            GroupKind::GlobalOptions => vec![
                self.binary.to_string_lossy().to_string(),
                "-y".to_string(),
                "-progress".to_string(),
                "pipe:1".to_string(),
                "-nostats".to_string(),
            ],
            GroupKind::Inputs => self
                .inputs
                .iter()
                .flat_map(|p| ["-i".to_string(), p.to_string_lossy().to_string()])
                .collect(),
            GroupKind::Filter => vec!["-vf".to_string(), self.video_filter.clone()],
            GroupKind::StreamMap => self
                .stream_maps
                .iter()
                .flat_map(|m| ["-map".to_string(), m.clone()])
                .collect(),
            GroupKind::Codec => vec!["-c:a".to_string(), self.audio_codec.clone()],
            GroupKind::Metadata => self
                .tags
                .iter()
                .flat_map(|t| [t.scope.flag().to_string(), format!("{}={}", t.key, t.value)])
                .collect(),
            GroupKind::Flags => vec!["-movflags".to_string(), self.movflags.clone()],
            GroupKind::Output => vec![self.output.to_string_lossy().to_string()],
        }
    }

    /// Flattens all groups in [`GroupKind::ORDER`].
    pub fn render(self) -> RenderedCommand {
        let args = GroupKind::ORDER
            .iter()
            .flat_map(|kind| self.group(*kind))
            .collect();
        RenderedCommand { args }
    }
}

/// Flat argument sequence, program first, output path last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    args: Vec<String>,
}

impl RenderedCommand {
    /// Wraps an already flattened sequence.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Program to run.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Arguments after the program.
    pub fn args(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    /// The whole sequence.
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    /// The produced artifact, which is always the last element.
    pub fn output_path(&self) -> Option<&Path> {
        self.args.last().map(Path::new)
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Builds [`FfmpegCommand`]s from validated metadata.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    ffmpeg_path: PathBuf,
    audio_codec: String,
    output_format: String,
    scratch_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            audio_codec: config.audio_codec.clone(),
            output_format: config.output_format.clone(),
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    /// Path every command of this builder writes to.
    pub fn output_path(&self) -> PathBuf {
        self.scratch_dir
            .join(format!("{}.{}", OUTPUT_BASE_NAME, self.output_format))
    }

    /// Builds the command for `profile`, tagging the profile's keys.
    pub fn build(
        &self,
        inputs: &ConversionInputs,
        metadata: &MetadataMap,
        profile: Profile,
    ) -> Result<FfmpegCommand, ConverterError> {
        let mut command = self.build_base(inputs, metadata, profile.required_keys())?;
        command.add_tags_from(profile.tag_keys(), metadata);
        Ok(command)
    }

    /// Builds the command without any profile tags.
    ///
    /// `required` is checked before the global required keys.
    pub fn build_base(
        &self,
        inputs: &ConversionInputs,
        metadata: &MetadataMap,
        required: &[&str],
    ) -> Result<FfmpegCommand, ConverterError> {
        let resolved = inputs.resolve()?;
        metadata.require(required.iter().chain(REQUIRED_METADATA_KEYS).copied())?;

        // Both keys were just checked.
        let title = metadata.get("title").unwrap_or_default();
        let year = metadata.get("year").unwrap_or_default();

        Ok(FfmpegCommand {
            binary: self.ffmpeg_path.clone(),
            inputs: vec![resolved.content, resolved.thumbnail],
            video_filter: EVEN_SCALE_FILTER.to_string(),
            stream_maps: vec!["0:a".to_string(), "1:v".to_string()],
            audio_codec: self.audio_codec.clone(),
            tags: vec![
                MetadataTag::video_stream("title", "Album cover"),
                MetadataTag::video_stream("comment", "Cover (front)"),
                MetadataTag::global("title", title),
                MetadataTag::global("year", year),
            ],
            movflags: "faststart".to_string(),
            output: self.output_path(),
        })
    }
}
