use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Encoder and probe deadlines are not 0
/// - Codec, output format and binary paths are not empty
/// - Storage suffixes are not empty and differ from each other
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let converter = &config.converter;

    if converter.timeout_secs == 0 {
        return Err(invalid("converter.timeout_secs cannot be 0"));
    }
    if converter.probe_timeout_secs == 0 {
        return Err(invalid("converter.probe_timeout_secs cannot be 0"));
    }
    if converter.audio_codec.trim().is_empty() {
        return Err(invalid("converter.audio_codec cannot be empty"));
    }
    if converter.output_format.trim().is_empty() {
        return Err(invalid("converter.output_format cannot be empty"));
    }
    if converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(invalid("converter.ffmpeg_path cannot be empty"));
    }
    if converter.ffprobe_path.as_os_str().is_empty() {
        return Err(invalid("converter.ffprobe_path cannot be empty"));
    }

    // Storage validation
    let storage = &config.storage;
    if storage.content_suffix.is_empty() || storage.thumbnail_suffix.is_empty() {
        return Err(invalid("storage suffixes cannot be empty"));
    }
    if storage.content_suffix == storage.thumbnail_suffix {
        return Err(invalid(
            "storage.content_suffix and storage.thumbnail_suffix must differ",
        ));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
