//! Conversion jobs: from an uploaded metadata file to a converted artifact.
//!
//! A job is triggered by the key of a metadata ("event") file. The objects
//! next to it are classified into content and thumbnail, fetched into the
//! scratch directory, converted, published back to the blob store, and the
//! record named by the metadata gets its conversion status.

mod event;
mod runner;
mod types;

pub use event::{
    decode_event_key, encode_content_key, normalize_filename, parent_prefix, JobEvent,
    ObjectSuffixes,
};
pub use runner::JobRunner;
pub use types::{JobError, JobReport, RecordRef, RECORD_KEYS};
