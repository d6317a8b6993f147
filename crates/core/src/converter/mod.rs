//! Converter module for transcoding audio sources with FFmpeg.
//!
//! This module validates record metadata, picks a tagging [`Profile`],
//! renders an ordered FFmpeg command, probes the source duration and runs
//! the encoder under a deadline while tracking its `-progress` output.
//!
//! # Example
//!
//! ```ignore
//! use tagline_core::converter::{
//!     Converter, ConversionInputs, ConverterConfig, FfmpegConverter, MetadataMap, Profile,
//! };
//!
//! let converter = FfmpegConverter::new(ConverterConfig::default());
//! converter.validate().await?;
//!
//! let metadata = MetadataMap::from_json(&raw_json)?;
//! let profile = Profile::from_metadata(&metadata)?;
//! let inputs = ConversionInputs::new("/work/content", "/work/thumbnail");
//!
//! let command = converter
//!     .command_builder()
//!     .build(&inputs, &metadata, profile)?
//!     .render();
//! let duration = converter.probe_duration(&inputs.resolve()?.content).await?;
//! let state = converter.execute(&command, duration).await?;
//! println!("{}", state);
//! ```

mod command;
mod config;
mod error;
mod executor;
mod ffmpeg;
mod metadata;
mod probe;
mod profile;
mod progress;
mod time;
mod traits;
mod types;

pub use command::{
    CommandBuilder, FfmpegCommand, GroupKind, MetadataTag, RenderedCommand, TagScope,
    EVEN_SCALE_FILTER, OUTPUT_BASE_NAME,
};
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use executor::Executor;
pub use ffmpeg::FfmpegConverter;
pub use metadata::{MetadataMap, REQUIRED_METADATA_KEYS};
pub use probe::{parse_duration_output, DurationProber};
pub use profile::Profile;
pub use progress::{progress_lines, track};
pub use time::{format_duration, format_seconds, parse_timestamp};
pub use traits::Converter;
pub use types::{
    ConversionInputs, InputRole, ProgressSnapshot, ProgressState, ResolvedInputs, OUT_TIME_KEY,
    PHASE_END, PHASE_KEY,
};
