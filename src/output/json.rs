//! JSON snapshot sink
//!
//! Writes `artists.json`, `albums.json` and `tracks.json`, each a
//! pretty-printed array of flat objects, and reads them back for
//! database-only loads.

use crate::crawler::CrawlOutput;
use crate::output::traits::{ResultSink, SinkError, SinkResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const ARTISTS_FILE: &str = "artists.json";
pub const ALBUMS_FILE: &str = "albums.json";
pub const TRACKS_FILE: &str = "tracks.json";

/// Sink writing one JSON document per entity kind into a directory
#[derive(Debug, Clone)]
pub struct JsonSnapshotSink {
    dir: PathBuf,
}

impl JsonSnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultSink for JsonSnapshotSink {
    fn name(&self) -> &str {
        "json"
    }

    fn consume(&mut self, output: &CrawlOutput) -> SinkResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SinkError::Write {
            path: self.dir.display().to_string(),
            source,
        })?;

        write_array(&self.dir.join(ARTISTS_FILE), &output.artists)?;
        write_array(&self.dir.join(ALBUMS_FILE), &output.albums)?;
        write_array(&self.dir.join(TRACKS_FILE), &output.tracks)?;

        tracing::info!(
            "Wrote {} artists, {} albums, {} tracks to {}",
            output.artists.len(),
            output.albums.len(),
            output.tracks.len(),
            self.dir.display()
        );

        Ok(())
    }
}

fn write_array<T: Serialize>(path: &Path, records: &[T]) -> SinkResult<()> {
    let write_err = |source: std::io::Error| SinkError::Write {
        path: path.display().to_string(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|source| SinkError::Format {
        path: path.display().to_string(),
        source,
    })?;
    writer.write_all(b"\n").map_err(write_err)?;
    writer.flush().map_err(write_err)
}

/// Loads a snapshot previously written by [`JsonSnapshotSink`]
pub fn read_snapshot(dir: &Path) -> SinkResult<CrawlOutput> {
    Ok(CrawlOutput {
        artists: read_array(&dir.join(ARTISTS_FILE))?,
        albums: read_array(&dir.join(ALBUMS_FILE))?,
        tracks: read_array(&dir.join(TRACKS_FILE))?,
    })
}

fn read_array<T: DeserializeOwned>(path: &Path) -> SinkResult<Vec<T>> {
    let file = File::open(path).map_err(|source| SinkError::Read {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| SinkError::Format {
        path: path.display().to_string(),
        source,
    })
}
