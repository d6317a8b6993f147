//! Storage module for job inputs and converted artifacts.
//!
//! Provides the [`BlobStore`] trait and a filesystem-backed implementation.

mod error;
mod fs_store;
mod traits;

pub use error::StorageError;
pub use fs_store::FsBlobStore;
pub use traits::BlobStore;
