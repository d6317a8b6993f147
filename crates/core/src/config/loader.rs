use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "TAGLINE_CONFIG";

/// Configuration file used when `TAGLINE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Path of the configuration file, from `TAGLINE_CONFIG` or the default
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from file with environment variable overrides
///
/// `TAGLINE_<SECTION>_<FIELD>` overrides `<field>` in `[<section>]`, e.g.
/// `TAGLINE_CONVERTER_AUDIO_CODEC=libopus`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn env_provider() -> Env {
    // Field names contain underscores, so only the first one separates the section
    Env::prefixed("TAGLINE_")
        .ignore(&["config", "log_json"])
        .map(|key| key.as_str().replacen('_', ".", 1).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.converter.audio_codec, "aac");
        assert_eq!(config.converter.timeout_secs, 360);
        assert_eq!(config.storage.content_suffix, "_content");
        assert_eq!(config.database.path, PathBuf::from("tagline.db"));
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[converter]
audio_codec = "libopus"
output_format = "ogg"
probe_timeout_secs = 5

[storage]
root = "/srv/blobs"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.converter.audio_codec, "libopus");
        assert_eq!(config.converter.output_format, "ogg");
        assert_eq!(config.converter.probe_timeout_secs, 5);
        assert_eq!(config.storage.root, PathBuf::from("/srv/blobs"));
        assert_eq!(config.storage.thumbnail_suffix, "_thumbnail");
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[converter]
timeout_secs = "soon"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[converter]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[database]
path = "/var/lib/tagline/status.db"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.converter.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/tagline/status.db")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[converter]
audio_codec = "aac"
timeout_secs = 60
"#,
            )?;
            jail.set_env("TAGLINE_CONVERTER_AUDIO_CODEC", "libopus");
            jail.set_env("TAGLINE_STORAGE_CONTENT_TYPE", "audio/ogg");
            jail.set_env("TAGLINE_LOG_JSON", "1");

            let config = load_config(Path::new("config.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.converter.audio_codec, "libopus");
            assert_eq!(config.converter.timeout_secs, 60);
            assert_eq!(config.storage.content_type, "audio/ogg");
            Ok(())
        });
    }
}
