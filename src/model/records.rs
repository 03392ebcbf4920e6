//! Output records handed to the result sinks
//!
//! Field names match the JSON snapshot layout: provenance keys are flattened
//! into each object, and a track's artist list is serialized under the
//! singular key `artist`.

use crate::model::api::{ApiAlbum, ApiArtist, ApiRef, ApiTrack};
use crate::model::Provenance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `{id, name}` pair used for artist lists, track summaries and album back-references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<&ApiRef> for EntityRef {
    fn from(r: &ApiRef) -> Self {
        Self::new(r.id.clone(), r.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: u32,
    #[serde(flatten)]
    pub provenance: Arc<Provenance>,
}

impl Artist {
    pub fn from_api(artist: ApiArtist, provenance: &Arc<Provenance>) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            genres: artist.genres,
            popularity: artist.popularity,
            provenance: Arc::clone(provenance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub release_date: String,
    /// Count advertised by the API, not the number of tracks crawled
    pub total_tracks: u32,
    pub popularity: u32,
    pub artists: Vec<EntityRef>,
    /// One summary per successfully fetched track
    #[serde(default)]
    pub tracks: Vec<EntityRef>,
    #[serde(flatten)]
    pub provenance: Arc<Provenance>,
}

impl Album {
    pub fn from_api(
        album: &ApiAlbum,
        tracks: Vec<EntityRef>,
        provenance: &Arc<Provenance>,
    ) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            release_date: album.release_date.clone(),
            total_tracks: album.total_tracks,
            popularity: album.popularity,
            artists: album.artists.iter().map(EntityRef::from).collect(),
            tracks,
            provenance: Arc::clone(provenance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(rename = "artist")]
    pub artists: Vec<EntityRef>,
    pub album: EntityRef,
    pub duration_ms: u64,
    pub explicit: bool,
    pub popularity: u32,
    #[serde(flatten)]
    pub provenance: Arc<Provenance>,
}

impl Track {
    pub fn from_api(track: ApiTrack, album: &ApiAlbum, provenance: &Arc<Provenance>) -> Self {
        Self {
            id: track.id,
            name: track.name,
            artists: track.artists.iter().map(EntityRef::from).collect(),
            album: EntityRef::new(album.id.clone(), album.name.clone()),
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            popularity: track.popularity,
            provenance: Arc::clone(provenance),
        }
    }

    /// The lightweight `{id, name}` entry stored on the owning album
    pub fn summary(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.name.clone())
    }
}
