//! Media profiles selecting which optional tags are copied to the output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ConverterError;
use super::metadata::MetadataMap;

/// Category of the media being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Music,
    Podcast,
}

impl Profile {
    /// Keys this profile requires on top of the global required set.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Music => &["artist", "album", "genre"],
            Self::Podcast => &["presenter", "description"],
        }
    }

    /// Keys copied into output tags, in tag order, when present and non-empty.
    pub fn tag_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Music => &["artist", "album", "genre"],
            Self::Podcast => &["presenter", "description"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::Podcast => "podcast",
        }
    }

    /// Selects the profile named by the metadata `type` key.
    pub fn from_metadata(metadata: &MetadataMap) -> Result<Self, ConverterError> {
        metadata.get("type").unwrap_or_default().parse()
    }
}

impl FromStr for Profile {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "music" => Ok(Self::Music),
            "podcast" => Ok(Self::Podcast),
            other => Err(ConverterError::UnknownProfile {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
