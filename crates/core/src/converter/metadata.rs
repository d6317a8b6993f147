//! Flat string metadata and required-key validation.

use serde_json::Value;
use std::collections::HashMap;

use super::error::ConverterError;

/// Keys every profile requires.
pub const REQUIRED_METADATA_KEYS: &[&str] = &["title", "year"];

/// Caller-owned metadata, one string value per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: HashMap<String, String>,
}

impl MetadataMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object.
    ///
    /// Every value must be a JSON string; numbers, booleans, nulls and nested
    /// values are rejected rather than coerced.
    pub fn from_json(json: &str) -> Result<Self, ConverterError> {
        let raw: HashMap<String, Value> =
            serde_json::from_str(json).map_err(|e| ConverterError::InvalidMetadata {
                reason: format!("failed to parse JSON: {}", e),
            })?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            match value {
                Value::String(s) => {
                    entries.insert(key, s);
                }
                _ => {
                    return Err(ConverterError::InvalidMetadata {
                        reason: format!("metadata field {} is not a string", key),
                    })
                }
            }
        }

        Ok(Self { entries })
    }

    /// Sets a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key` when it is present and not empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every key in `required` is present and not empty.
    ///
    /// Fails on the first offending key, in the order given.
    pub fn require<'a, I>(&self, required: I) -> Result<(), ConverterError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in required {
            if self.non_empty(key).is_none() {
                return Err(ConverterError::missing_metadata(key));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
