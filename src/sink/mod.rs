mod csv;

pub use csv::{CsvRecordSink, CSV_HEADER};

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Discovery;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable, append-only home for discoveries.
///
/// Implementations must keep appends ordered with respect to each other.
pub trait RecordSink: Send + Sync {
    /// Drop everything from a previous session.
    fn reset(&self) -> Result<(), SinkError>;

    fn append(&self, discovery: &Discovery) -> Result<(), SinkError>;
}
