//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Audio codec passed to `-c:a`.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Output container extension, without the dot.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Scratch directory holding inputs and the produced file of one conversion.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Deadline for a single encoder run in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Deadline for a duration probe in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_output_format() -> String {
    "m4a".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("tagline-work")
}

fn default_timeout() -> u64 {
    360 // 6 minutes
}

fn default_probe_timeout() -> u64 {
    2
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            audio_codec: default_audio_codec(),
            output_format: default_output_format(),
            scratch_dir: default_scratch_dir(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the scratch directory.
    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    /// Sets the audio codec and output extension.
    pub fn with_output(
        mut self,
        audio_codec: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        self.audio_codec = audio_codec.into();
        self.output_format = output_format.into();
        self
    }

    /// Sets the encoder timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the probe timeout in seconds.
    pub fn with_probe_timeout(mut self, probe_timeout_secs: u64) -> Self {
        self.probe_timeout_secs = probe_timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.audio_codec, "aac");
        assert_eq!(config.output_format, "m4a");
        assert_eq!(config.timeout_secs, 360);
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_scratch_dir(PathBuf::from("/tmp/test"))
        .with_output("libmp3lame", "mp3")
        .with_timeout(60)
        .with_probe_timeout(5);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/test"));
        assert_eq!(config.output_format, "mp3");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.probe_timeout_secs, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
