//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! The `main` schema is the database file itself; any other schema is a
//! sibling `<schema>.db` file attached under that name.

use crate::config::validate_schema_name;
use crate::storage::rows::FlatTables;
use crate::storage::schema::{create_table_sql, insert_sql, load_runs_sql, CATALOG_TABLES};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::LoadRunRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};

pub const MAIN_SCHEMA: &str = "main";

/// SQLite storage backend for the catalog tables
pub struct CatalogStore {
    conn: Connection,
    schema: String,
}

impl CatalogStore {
    /// Opens or creates the catalog database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `schema` - Schema the tables are written to
    ///
    /// # Returns
    ///
    /// * `Ok(CatalogStore)` - Database opened and `load_runs` present
    /// * `Err(StorageError)` - Bad schema name or database failure
    pub fn open(path: &Path, schema: &str) -> StorageResult<Self> {
        validate_schema_name(schema).map_err(|e| StorageError::InvalidSchema(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        if !schema.eq_ignore_ascii_case(MAIN_SCHEMA) {
            let attached = schema_file(path, schema);
            tracing::debug!("Attaching {} as schema {}", attached.display(), schema);
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {}", schema),
                params![attached.to_string_lossy().into_owned()],
            )?;
        }

        Self::initialize(conn, schema)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::initialize(Connection::open_in_memory()?, MAIN_SCHEMA)
    }

    fn initialize(conn: Connection, schema: &str) -> StorageResult<Self> {
        conn.execute_batch(&load_runs_sql(schema))?;
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }

    fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
                    self.schema
                ),
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// `<dir of database>/<schema>.db`
fn schema_file(database: &Path, schema: &str) -> PathBuf {
    let file = format!("{}.db", schema);
    match database.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

fn recreate_table(tx: &Transaction<'_>, schema: &str, table: &str) -> StorageResult<String> {
    let create =
        create_table_sql(schema, table).ok_or_else(|| StorageError::UnknownTable(table.into()))?;
    let insert =
        insert_sql(schema, table).ok_or_else(|| StorageError::UnknownTable(table.into()))?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}.{};", schema, table))?;
    tx.execute_batch(&create)?;
    Ok(insert)
}

fn insert_rows(tx: &Transaction<'_>, schema: &str, tables: &FlatTables) -> StorageResult<()> {
    let sql = recreate_table(tx, schema, "artists")?;
    let mut stmt = tx.prepare(&sql)?;
    for row in &tables.artists {
        let p = &row.provenance;
        stmt.execute(params![
            row.id,
            row.name,
            row.genres,
            row.popularity,
            p.extraction_datetime,
            p.source,
            p.extractor,
            p.data_version,
            p.timezone,
        ])?;
    }

    let sql = recreate_table(tx, schema, "albums")?;
    let mut stmt = tx.prepare(&sql)?;
    for row in &tables.albums {
        let p = &row.provenance;
        stmt.execute(params![
            row.id,
            row.name,
            row.release_date,
            row.total_tracks,
            row.popularity,
            row.artist_names,
            row.artist_ids,
            row.track_ids,
            row.track_names,
            p.extraction_datetime,
            p.source,
            p.extractor,
            p.data_version,
            p.timezone,
        ])?;
    }

    let sql = recreate_table(tx, schema, "tracks")?;
    let mut stmt = tx.prepare(&sql)?;
    for row in &tables.tracks {
        let p = &row.provenance;
        stmt.execute(params![
            row.id,
            row.name,
            row.artist_names,
            row.artist_ids,
            row.album_id,
            row.album_name,
            row.duration_ms as i64,
            row.explicit,
            row.popularity,
            p.extraction_datetime,
            p.source,
            p.extractor,
            p.data_version,
            p.timezone,
        ])?;
    }

    Ok(())
}

impl Storage for CatalogStore {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn replace_tables(&mut self, tables: &FlatTables, config_hash: &str) -> StorageResult<i64> {
        let schema = self.schema.clone();
        let tx = self.conn.transaction()?;

        insert_rows(&tx, &schema, tables)?;

        tx.execute(
            &format!(
                "INSERT INTO {}.load_runs (loaded_at, config_hash, artists, albums, tracks) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                schema
            ),
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                tables.artists.len() as i64,
                tables.albums.len() as i64,
                tables.tracks.len() as i64,
            ],
        )?;
        let load_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(load_id)
    }

    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        if !CATALOG_TABLES.contains(&table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }
        if !self.table_exists(table)? {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}.{}", self.schema, table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn latest_load_run(&self) -> StorageResult<Option<LoadRunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, loaded_at, config_hash, artists, albums, tracks \
                     FROM {}.load_runs ORDER BY id DESC LIMIT 1",
                    self.schema
                ),
                [],
                |row| {
                    Ok(LoadRunRecord {
                        id: row.get(0)?,
                        loaded_at: row.get(1)?,
                        config_hash: row.get(2)?,
                        artists: row.get::<_, i64>(3)? as u64,
                        albums: row.get::<_, i64>(4)? as u64,
                        tracks: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(run)
    }
}
