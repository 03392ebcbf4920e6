//! Storage module for loading crawl results into SQLite
//!
//! This module handles all database operations, including:
//! - Flattening records into table rows
//! - Schema attachment and table replacement
//! - Load bookkeeping in `load_runs`

mod rows;
mod schema;
mod sqlite;
mod traits;

pub use rows::{AlbumRow, ArtistRow, FlatTables, ProvenanceColumns, TrackRow};
pub use schema::CATALOG_TABLES;
pub use sqlite::{CatalogStore, MAIN_SCHEMA};
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::OutputConfig;
use crate::crawler::CrawlOutput;
use crate::output::{ResultSink, SinkResult};
use std::path::Path;

/// Opens the catalog database named by the output configuration
pub fn open_store(config: &OutputConfig) -> StorageResult<CatalogStore> {
    CatalogStore::open(Path::new(&config.database_path), &config.schema)
}

/// Represents one load into the catalog tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRunRecord {
    pub id: i64,
    pub loaded_at: String,
    pub config_hash: String,
    pub artists: u64,
    pub albums: u64,
    pub tracks: u64,
}

/// Sink loading the crawl output into the catalog tables
///
/// Each consume replaces the previous contents of all three tables.
pub struct SqliteSink<S: Storage> {
    storage: S,
    config_hash: String,
}

impl<S: Storage> SqliteSink<S> {
    pub fn new(storage: S, config_hash: impl Into<String>) -> Self {
        Self {
            storage,
            config_hash: config_hash.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> ResultSink for SqliteSink<S> {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn consume(&mut self, output: &CrawlOutput) -> SinkResult<()> {
        let tables = FlatTables::from_output(output);
        let load_id = self.storage.replace_tables(&tables, &self.config_hash)?;

        tracing::info!(
            "Load {} wrote {} artists, {} albums, {} tracks to schema {}",
            load_id,
            tables.artists.len(),
            tables.albums.len(),
            tables.tracks.len(),
            self.storage.schema()
        );
        Ok(())
    }
}
