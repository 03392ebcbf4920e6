//! Database schema definitions
//!
//! This module contains the SQL for the catalog tables. Every statement is
//! rendered for a given schema name, which has already been validated as a
//! plain identifier.

/// Tables replaced on every load
pub const CATALOG_TABLES: [&str; 3] = ["artists", "albums", "tracks"];

const PROVENANCE_COLUMNS: &str = "
    extraction_datetime TEXT,
    source TEXT,
    extractor TEXT,
    data_version TEXT,
    timezone TEXT";

/// `CREATE TABLE` for one of the catalog tables
pub fn create_table_sql(schema: &str, table: &str) -> Option<String> {
    let columns = match table {
        "artists" => {
            "
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    genres TEXT NOT NULL,
    popularity INTEGER NOT NULL,"
        }
        "albums" => {
            "
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    release_date TEXT,
    total_tracks INTEGER,
    popularity INTEGER,
    artist_names TEXT NOT NULL,
    artist_ids TEXT NOT NULL,
    track_ids TEXT NOT NULL,
    track_names TEXT NOT NULL,"
        }
        "tracks" => {
            "
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    artist_names TEXT NOT NULL,
    artist_ids TEXT NOT NULL,
    album_id TEXT NOT NULL,
    album_name TEXT NOT NULL,
    duration_ms INTEGER,
    explicit INTEGER,
    popularity INTEGER,"
        }
        _ => return None,
    };

    Some(format!(
        "CREATE TABLE {}.{} ({}{}\n);",
        schema, table, columns, PROVENANCE_COLUMNS
    ))
}

/// `INSERT` statements with positional parameters, in column order
pub fn insert_sql(schema: &str, table: &str) -> Option<String> {
    let (columns, count) = match table {
        "artists" => ("id, name, genres, popularity", 4),
        "albums" => (
            "id, name, release_date, total_tracks, popularity, \
             artist_names, artist_ids, track_ids, track_names",
            9,
        ),
        "tracks" => (
            "id, name, artist_names, artist_ids, album_id, album_name, \
             duration_ms, explicit, popularity",
            9,
        ),
        _ => return None,
    };

    let placeholders = (1..=count + 5)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "INSERT INTO {}.{} ({}, extraction_datetime, source, extractor, data_version, timezone) \
         VALUES ({})",
        schema, table, columns, placeholders
    ))
}

/// Bookkeeping of every load into the schema
pub fn load_runs_sql(schema: &str) -> String {
    format!(
        "
CREATE TABLE IF NOT EXISTS {schema}.load_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    loaded_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    artists INTEGER NOT NULL,
    albums INTEGER NOT NULL,
    tracks INTEGER NOT NULL
);
",
        schema = schema
    )
}
