//! Run and database statistics
//!
//! This module formats crawl summaries and the per-table statistics of a
//! loaded database for the terminal.

use crate::crawler::CrawlSummary;
use crate::storage::{LoadRunRecord, Storage};
use crate::storage::StorageResult as Result;

/// Row counts of a loaded schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStatistics {
    pub schema: String,
    pub artists: u64,
    pub albums: u64,
    pub tracks: u64,
    pub last_load: Option<LoadRunRecord>,
}

/// Loads statistics from storage
///
/// Tables that were never loaded count as zero rows.
pub fn load_statistics(store: &dyn Storage) -> Result<DatabaseStatistics> {
    Ok(DatabaseStatistics {
        schema: store.schema().to_string(),
        artists: store.count_rows("artists")?,
        albums: store.count_rows("albums")?,
        tracks: store.count_rows("tracks")?,
        last_load: store.latest_load_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Catalog Statistics ({}) ===\n", stats.schema);

    println!("Tables:");
    println!("  artists: {}", stats.artists);
    println!("  albums:  {}", stats.albums);
    println!("  tracks:  {}", stats.tracks);
    println!();

    match &stats.last_load {
        Some(run) => {
            println!("Last load:");
            println!("  Loaded at: {}", run.loaded_at);
            println!("  Config hash: {}", run.config_hash);
            println!(
                "  Rows: {} artists, {} albums, {} tracks",
                run.artists, run.albums, run.tracks
            );
        }
        None => println!("No loads recorded"),
    }
}

/// Prints the tallies of a finished crawl
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Artists:");
    println!("  Seeds: {}", summary.seeds);
    println!("  Crawled: {}", summary.artists_crawled);
    println!("  Below popularity threshold: {}", summary.artists_filtered);
    println!("  Unavailable: {}", summary.artists_missing);
    println!("  Failed: {}", summary.artist_failures);
    println!();

    println!("Records:");
    println!("  Albums: {}", summary.albums);
    println!("  Tracks: {}", summary.tracks);
    println!();

    println!("Requests:");
    println!("  Attempts: {}", summary.requests);
    println!("  Rate limited: {}", summary.rate_limited);
    println!("  Given up: {}", summary.failed_requests);
    println!("  Peak in flight: {}", summary.peak_in_flight);
    println!();

    println!("Duration: {:.1}s", summary.duration.as_secs_f64());
}
