//! Result sink trait and error types
//!
//! A sink receives the three record collections once, at the end of a run.
//! Sinks never feed anything back into the crawl.

use crate::crawler::CrawlOutput;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while handing records to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed snapshot {path}: {source}")]
    Format {
        path: String,
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for the records of a finished crawl
///
/// Implementations must write exactly the fields of the records they are
/// given; they may reshape them (for example into flat table rows) but not
/// drop required keys.
pub trait ResultSink {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Persists the artists, albums and tracks of one run
    ///
    /// # Arguments
    ///
    /// * `output` - Everything the crawl collected
    fn consume(&mut self, output: &CrawlOutput) -> SinkResult<()>;
}
