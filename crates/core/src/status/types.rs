//! Types for conversion status records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::converter::format_seconds;

/// Conversion state stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStatus {
    /// Registered, not converted yet.
    Pending,
    Success,
    Error,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }

    /// Parses a stored value. Unknown values read back as `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "SUCCESS" => Some(Self::Success),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content record tracked by the status store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub collection: String,
    pub conversion_status: ConversionStatus,
    /// Key of the converted artifact, set on success.
    pub content_key: Option<String>,
    /// Source duration as `HH:MM:SS`, set on success.
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of one conversion job.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    Success {
        content_key: String,
        duration_secs: f64,
    },
    Failure,
}

impl StatusOutcome {
    pub fn status(&self) -> ConversionStatus {
        match self {
            Self::Success { .. } => ConversionStatus::Success,
            Self::Failure => ConversionStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Duration formatted for storage, on success.
    pub fn formatted_duration(&self) -> Option<String> {
        match self {
            Self::Success { duration_secs, .. } => Some(format_seconds(*duration_secs)),
            Self::Failure => None,
        }
    }
}

/// Update applied to one record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub id: String,
    pub collection: String,
    pub outcome: StatusOutcome,
}

impl StatusUpdate {
    pub fn success(
        id: impl Into<String>,
        collection: impl Into<String>,
        content_key: impl Into<String>,
        duration_secs: f64,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            outcome: StatusOutcome::Success {
                content_key: content_key.into(),
                duration_secs,
            },
        }
    }

    pub fn failure(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            outcome: StatusOutcome::Failure,
        }
    }
}
