//! Response shapes of the catalog API
//!
//! Only the fields the crawler reads are modelled. Required identity fields
//! (`id`, `name`) have no default and must not be blank, so a payload missing
//! them fails to decode instead of producing a nameless record.

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer};

/// Rejects a string that is empty or only whitespace
fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(de::Error::invalid_value(
            Unexpected::Str(&value),
            &"a non-empty string",
        ));
    }
    Ok(value)
}

/// `{id, name}` reference embedded in album and track payloads
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    pub name: String,
}

/// `GET /artists/{id}` and the items of an artist search
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    #[serde(deserialize_with = "non_blank")]
    pub id: String,
    #[serde(deserialize_with = "non_blank")]
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
}

/// Item of `GET /artists/{id}/albums`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbumStub {
    pub id: String,
}

/// Item of an album's embedded track page
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrackStub {
    pub id: String,
}

/// `GET /albums/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbum {
    #[serde(deserialize_with = "non_blank")]
    pub id: String,
    #[serde(deserialize_with = "non_blank")]
    pub name: String,
    pub release_date: String,
    pub total_tracks: u32,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub artists: Vec<ApiRef>,
    #[serde(default)]
    pub tracks: Paging<ApiTrackStub>,
}

/// `GET /tracks/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    #[serde(deserialize_with = "non_blank")]
    pub id: String,
    #[serde(deserialize_with = "non_blank")]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiRef>,
    pub duration_ms: u64,
    pub explicit: bool,
    #[serde(default)]
    pub popularity: u32,
}

/// A page of results; only the first page is ever read
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Item of an artist search; the full record comes from `GET /artists/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub popularity: u32,
}

/// `GET /search?type=artist`
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistSearch {
    pub artists: Paging<SearchHit>,
}
