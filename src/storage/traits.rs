//! Storage traits and error types
//!
//! This module defines the trait interface for catalog storage backends and
//! associated error types.

use crate::storage::rows::FlatTables;
use crate::storage::LoadRunRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid schema name: {0}")]
    InvalidSchema(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog storage backends
pub trait Storage {
    /// Schema the catalog tables live in
    fn schema(&self) -> &str;

    /// Replaces the artists, albums and tracks tables with the given rows
    ///
    /// All three tables are dropped, recreated and filled inside a single
    /// transaction, and the load is recorded in `load_runs`.
    ///
    /// # Arguments
    ///
    /// * `tables` - Flattened rows of one crawl
    /// * `config_hash` - Hash of the configuration that produced them
    ///
    /// # Returns
    ///
    /// The ID of the recorded load
    fn replace_tables(&mut self, tables: &FlatTables, config_hash: &str) -> StorageResult<i64>;

    /// Counts the rows of a catalog table, zero if it was never created
    fn count_rows(&self, table: &str) -> StorageResult<u64>;

    /// Gets the most recent load
    fn latest_load_run(&self) -> StorageResult<Option<LoadRunRecord>>;
}
