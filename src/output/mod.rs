//! Output module for handing crawl results to their destinations
//!
//! This module handles:
//! - The `ResultSink` interface every destination implements
//! - Writing and reading the JSON snapshots
//! - Printing run and database statistics

mod json;
pub mod stats;
mod traits;

pub use json::{read_snapshot, JsonSnapshotSink, ALBUMS_FILE, ARTISTS_FILE, TRACKS_FILE};
pub use stats::{load_statistics, print_crawl_summary, print_statistics, DatabaseStatistics};
pub use traits::{ResultSink, SinkError, SinkResult};

use crate::crawler::CrawlOutput;

/// Hands the output to every sink in order
///
/// Stops at the first failing sink; earlier sinks keep what they wrote.
pub fn deliver(output: &CrawlOutput, sinks: &mut [Box<dyn ResultSink>]) -> SinkResult<()> {
    for sink in sinks.iter_mut() {
        tracing::info!("Delivering results to {} sink", sink.name());
        sink.consume(output)?;
    }
    Ok(())
}
