//! Conversion status records for converted content.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteStatusStore;
pub use store::{StatusError, StatusStore};
pub use types::{ConversionStatus, StatusOutcome, StatusRecord, StatusUpdate};
