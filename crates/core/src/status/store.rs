//! Status store trait and error type.

use thiserror::Error;

use super::types::{StatusRecord, StatusUpdate};

/// Error type for status store operations.
#[derive(Debug, Error)]
pub enum StatusError {
    /// No record with this id in the collection.
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Id is blank after trimming.
    #[error("Invalid record id: {id:?}")]
    InvalidId { id: String },

    /// Collection name is blank after trimming.
    #[error("Invalid collection name: {collection:?}")]
    InvalidCollection { collection: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for status record storage.
///
/// Ids and collection names are trimmed before use.
pub trait StatusStore: Send + Sync {
    /// Register a record as pending. Registering an existing record returns it unchanged.
    fn register(&self, id: &str, collection: &str) -> Result<StatusRecord, StatusError>;

    /// Apply a conversion outcome to an existing record.
    fn update(&self, update: &StatusUpdate) -> Result<StatusRecord, StatusError>;

    /// Get a record by collection and id.
    fn get(&self, collection: &str, id: &str) -> Result<Option<StatusRecord>, StatusError>;
}

/// Trims `id` and `collection`, rejecting blank values.
pub(crate) fn normalize<'a>(id: &'a str, collection: &'a str) -> Result<(&'a str, &'a str), StatusError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(StatusError::InvalidId { id: id.to_string() });
    }
    let trimmed_collection = collection.trim();
    if trimmed_collection.is_empty() {
        return Err(StatusError::InvalidCollection {
            collection: collection.to_string(),
        });
    }
    Ok((trimmed_id, trimmed_collection))
}
