//! Flattening of crawl records into table rows
//!
//! Nested lists become comma-joined text columns. Joined columns are never
//! null: an empty list (including an album whose every track failed to
//! fetch) becomes an empty string.

use crate::crawler::CrawlOutput;
use crate::model::{Album, Artist, EntityRef, Provenance, Track};

const LIST_SEPARATOR: &str = ", ";

/// The five provenance columns shared by every table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceColumns {
    pub extraction_datetime: String,
    pub source: String,
    pub extractor: String,
    pub data_version: String,
    pub timezone: String,
}

impl From<&Provenance> for ProvenanceColumns {
    fn from(p: &Provenance) -> Self {
        Self {
            extraction_datetime: p.extraction_datetime.clone(),
            source: p.source.clone(),
            extractor: p.extractor.clone(),
            data_version: p.data_version.clone(),
            timezone: p.timezone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRow {
    pub id: String,
    pub name: String,
    pub genres: String,
    pub popularity: u32,
    pub provenance: ProvenanceColumns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRow {
    pub id: String,
    pub name: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub popularity: u32,
    pub artist_names: String,
    pub artist_ids: String,
    pub track_ids: String,
    pub track_names: String,
    pub provenance: ProvenanceColumns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub id: String,
    pub name: String,
    pub artist_names: String,
    pub artist_ids: String,
    pub album_id: String,
    pub album_name: String,
    pub duration_ms: u64,
    pub explicit: bool,
    pub popularity: u32,
    pub provenance: ProvenanceColumns,
}

/// Row sets for the three destination tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTables {
    pub artists: Vec<ArtistRow>,
    pub albums: Vec<AlbumRow>,
    pub tracks: Vec<TrackRow>,
}

impl FlatTables {
    pub fn from_output(output: &CrawlOutput) -> Self {
        Self {
            artists: output.artists.iter().map(ArtistRow::from).collect(),
            albums: output.albums.iter().map(AlbumRow::from).collect(),
            tracks: output.tracks.iter().map(TrackRow::from).collect(),
        }
    }
}

fn join_ids(refs: &[EntityRef]) -> String {
    join(refs.iter().map(|r| r.id.as_str()))
}

fn join_names(refs: &[EntityRef]) -> String {
    join(refs.iter().map(|r| r.name.as_str()))
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(LIST_SEPARATOR)
}

impl From<&Artist> for ArtistRow {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
            genres: join(artist.genres.iter().map(String::as_str)),
            popularity: artist.popularity,
            provenance: ProvenanceColumns::from(artist.provenance.as_ref()),
        }
    }
}

impl From<&Album> for AlbumRow {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            release_date: album.release_date.clone(),
            total_tracks: album.total_tracks,
            popularity: album.popularity,
            artist_names: join_names(&album.artists),
            artist_ids: join_ids(&album.artists),
            track_ids: join_ids(&album.tracks),
            track_names: join_names(&album.tracks),
            provenance: ProvenanceColumns::from(album.provenance.as_ref()),
        }
    }
}

impl From<&Track> for TrackRow {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            artist_names: join_names(&track.artists),
            artist_ids: join_ids(&track.artists),
            album_id: track.album.id.clone(),
            album_name: track.album.name.clone(),
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            popularity: track.popularity,
            provenance: ProvenanceColumns::from(track.provenance.as_ref()),
        }
    }
}
