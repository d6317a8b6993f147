//! Event key decoding and sibling object classification.

use crate::config::StorageConfig;
use crate::converter::InputRole;

use super::types::JobError;

/// Suffixes distinguishing the uploads of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSuffixes {
    pub content: String,
    pub thumbnail: String,
}

impl From<&StorageConfig> for ObjectSuffixes {
    fn from(config: &StorageConfig) -> Self {
        Self {
            content: config.content_suffix.clone(),
            thumbnail: config.thumbnail_suffix.clone(),
        }
    }
}

/// Objects making up one conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    /// Key of the metadata file that triggered the job.
    pub event_key: String,
    /// Directory of the event key, without trailing `/`.
    pub prefix: String,
    pub thumbnail_key: String,
    /// Audio to convert: a replacement upload when present, else the suffixed original.
    pub content_key: String,
}

impl JobEvent {
    /// Classifies the objects listed under the event key's directory.
    ///
    /// `event_key` must already be decoded.
    pub fn classify<S: AsRef<str>>(
        event_key: &str,
        keys: &[S],
        suffixes: &ObjectSuffixes,
    ) -> Result<Self, JobError> {
        let prefix = parent_prefix(event_key);
        let marker = format!("{}/", prefix);

        let mut thumbnail = None;
        let mut suffixed_content = None;
        let mut replacement = None;

        for key in keys {
            let key = key.as_ref();
            if key == event_key || key == marker {
                continue;
            }

            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if key.ends_with(&suffixes.thumbnail) {
                thumbnail = Some(key);
            } else if key.ends_with(&suffixes.content) {
                suffixed_content = Some(key);
            } else {
                replacement = Some(key);
            }
        }

        let thumbnail_key = thumbnail.ok_or(JobError::MissingObject {
            role: InputRole::Thumbnail,
        })?;
        let content_key = replacement
            .or(suffixed_content)
            .ok_or(JobError::MissingObject {
                role: InputRole::Content,
            })?;

        Ok(Self {
            event_key: event_key.to_string(),
            prefix: prefix.to_string(),
            thumbnail_key: thumbnail_key.to_string(),
            content_key: content_key.to_string(),
        })
    }

    /// Key the converted artifact is uploaded under, next to the event key.
    pub fn artifact_key(&self, title: &str, output_format: &str) -> String {
        let name = normalize_filename(title);
        if self.prefix.is_empty() {
            format!("{}.{}", name, output_format)
        } else {
            format!("{}/{}.{}", self.prefix, name, output_format)
        }
    }
}

/// Decodes a percent-encoded event key; `+` stands for a space.
pub fn decode_event_key(raw: &str) -> Result<String, JobError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| JobError::InvalidEventKey {
            key: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Everything before the last `/`, or empty when there is none.
pub fn parent_prefix(key: &str) -> &str {
    key.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default()
}

/// Replaces characters that are not allowed in file names with `_`.
pub fn normalize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Percent-encodes the file-name component of `key`, leaving the directory as is.
pub fn encode_content_key(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((dir, name)) => format!("{}/{}", dir, escape_path_segment(name)),
        None => escape_path_segment(key),
    }
}

/// Path-segment escaping: sub-delimiters, `:` and `@` stay literal.
fn escape_path_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    let mut buf = [0u8; 4];
    for c in segment.chars() {
        match c {
            '$' | '&' | '+' | ',' | ':' | ';' | '=' | '@' => escaped.push(c),
            c => escaped.push_str(&urlencoding::encode(c.encode_utf8(&mut buf))),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes() -> ObjectSuffixes {
        ObjectSuffixes::from(&StorageConfig::default())
    }

    #[test]
    fn test_decode_event_key() {
        assert_eq!(
            decode_event_key("shows/My+Show/ep%231/meta.json").unwrap(),
            "shows/My Show/ep#1/meta.json"
        );
        assert_eq!(decode_event_key("plain/key").unwrap(), "plain/key");
        assert!(matches!(
            decode_event_key("bad/%FF%FE"),
            Err(JobError::InvalidEventKey { .. })
        ));
    }

    #[test]
    fn test_parent_prefix() {
        assert_eq!(parent_prefix("a/b/meta.json"), "a/b");
        assert_eq!(parent_prefix("meta.json"), "");
        assert_eq!(parent_prefix("a/"), "a");
    }

    #[test]
    fn test_classify_creation_upload() {
        let keys = [
            "shows/ep1/",
            "shows/ep1/ep1_content",
            "shows/ep1/ep1_thumbnail",
            "shows/ep1/meta.json",
        ];
        let event = JobEvent::classify("shows/ep1/meta.json", &keys, &suffixes()).unwrap();

        assert_eq!(event.prefix, "shows/ep1");
        assert_eq!(event.content_key, "shows/ep1/ep1_content");
        assert_eq!(event.thumbnail_key, "shows/ep1/ep1_thumbnail");
    }

    #[test]
    fn test_classify_replacement_content_wins() {
        let keys = [
            "shows/ep1/ep1_content",
            "shows/ep1/ep1_thumbnail",
            "shows/ep1/meta.json",
            "shows/ep1/new upload.flac ",
        ];
        let event = JobEvent::classify("shows/ep1/meta.json", &keys, &suffixes()).unwrap();

        assert_eq!(event.content_key, "shows/ep1/new upload.flac");
    }

    #[test]
    fn test_classify_missing_objects() {
        let err = JobEvent::classify(
            "shows/ep1/meta.json",
            &["shows/ep1/meta.json", "shows/ep1/ep1_content"],
            &suffixes(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            JobError::MissingObject {
                role: InputRole::Thumbnail
            }
        ));

        let err = JobEvent::classify(
            "shows/ep1/meta.json",
            &["shows/ep1/meta.json", "shows/ep1/ep1_thumbnail"],
            &suffixes(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            JobError::MissingObject {
                role: InputRole::Content
            }
        ));
    }

    #[test]
    fn test_artifact_key() {
        let event = JobEvent::classify(
            "shows/ep1/meta.json",
            &["shows/ep1/a_content", "shows/ep1/a_thumbnail"],
            &suffixes(),
        )
        .unwrap();
        assert_eq!(event.artifact_key("Episode One", "m4a"), "shows/ep1/Episode One.m4a");

        let root = JobEvent::classify("meta.json", &["a_content", "a_thumbnail"], &suffixes())
            .unwrap();
        assert_eq!(root.artifact_key("Song", "m4a"), "Song.m4a");
        assert_eq!(
            event.artifact_key("../Best Of", "m4a"),
            "shows/ep1/.._Best Of.m4a"
        );
        assert_eq!(event.artifact_key("a//b", "m4a"), "shows/ep1/a__b.m4a");
    }

    #[test]
    fn test_normalize_filename() {
        assert_eq!(
            normalize_filename(r#"a/b\c:d*e?f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
        assert_eq!(normalize_filename("AC&DC Live"), "AC&DC Live");
    }

    #[test]
    fn test_encode_content_key() {
        assert_eq!(
            encode_content_key("shows/ep1/Episode One.m4a"),
            "shows/ep1/Episode%20One.m4a"
        );
        assert_eq!(encode_content_key("Song #1.m4a"), "Song%20%231.m4a");
        assert_eq!(
            encode_content_key("music/abc/AC&DC_ Live+1,2;x=y@$.m4a"),
            "music/abc/AC&DC_%20Live+1,2;x=y@$.m4a"
        );
        assert_eq!(encode_content_key("a:b?.m4a"), "a:b%3F.m4a");
    }
}
