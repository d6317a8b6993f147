//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a mock converter and metadata fixtures, allowing the
//! job runner to be tested without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use tagline_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::new();
//! converter.set_default_duration(120.0).await;
//!
//! let metadata = fixtures::music_metadata("65f1c0ffee", "Song");
//! // Upload `metadata` next to content and thumbnail objects, then run the job...
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedExecution};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    /// Metadata JSON for a music record.
    pub fn music_metadata(id: &str, title: &str) -> String {
        json!({
            "id": id,
            "collection_name": "music",
            "type": "music",
            "title": title,
            "year": "2021",
            "artist": "The Band",
            "album": "First Record",
            "genre": "Rock",
        })
        .to_string()
    }

    /// Metadata JSON for a podcast episode record.
    pub fn podcast_metadata(id: &str, title: &str) -> String {
        json!({
            "id": id,
            "collection_name": "podcasts",
            "type": "podcast",
            "title": title,
            "year": "2024",
            "presenter": "Jane Host",
            "description": "Weekly talk show",
        })
        .to_string()
    }
}
