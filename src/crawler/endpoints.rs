//! Typed request builders for the four catalog resources
//!
//! Each method only builds a URL and delegates to the shared
//! [`RateLimitedFetcher`]; retry and concurrency live there.

use crate::crawler::fetcher::RateLimitedFetcher;
use crate::model::api::{ApiAlbum, ApiAlbumStub, ApiArtist, ApiTrack, Paging};
use crate::CatalogError;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

/// Catalog API bound to a base URL and a set of auth headers
#[derive(Debug, Clone)]
pub struct CatalogApi {
    fetcher: RateLimitedFetcher,
    base_url: String,
    headers: HeaderMap,
    album_page_size: u32,
}

impl CatalogApi {
    pub fn new(
        fetcher: RateLimitedFetcher,
        base_url: &str,
        headers: HeaderMap,
        album_page_size: u32,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            album_page_size,
        }
    }

    pub fn fetcher(&self) -> &RateLimitedFetcher {
        &self.fetcher
    }

    /// `GET /artists/{id}`
    pub async fn artist(&self, artist_id: &str) -> Result<Option<ApiArtist>, CatalogError> {
        let url = self.resource_url(&["artists", artist_id])?;
        self.get("artist", url).await
    }

    /// `GET /artists/{id}/albums?limit={page size}&include_groups=album`
    pub async fn artist_albums(
        &self,
        artist_id: &str,
    ) -> Result<Option<Paging<ApiAlbumStub>>, CatalogError> {
        let mut url = self.resource_url(&["artists", artist_id, "albums"])?;
        url.query_pairs_mut()
            .append_pair("limit", &self.album_page_size.to_string())
            .append_pair("include_groups", "album");
        self.get("artist albums", url).await
    }

    /// `GET /albums/{id}`
    pub async fn album(&self, album_id: &str) -> Result<Option<ApiAlbum>, CatalogError> {
        let url = self.resource_url(&["albums", album_id])?;
        self.get("album", url).await
    }

    /// `GET /tracks/{id}`
    pub async fn track(&self, track_id: &str) -> Result<Option<ApiTrack>, CatalogError> {
        let url = self.resource_url(&["tracks", track_id])?;
        self.get("track", url).await
    }

    fn resource_url(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        resource_url(&self.base_url, segments)
    }

    /// Absence from the fetcher stays `None`; a 200 body of the wrong shape is an error
    async fn get<T: DeserializeOwned>(
        &self,
        what: &'static str,
        url: Url,
    ) -> Result<Option<T>, CatalogError> {
        match self.fetcher.fetch(url.as_str(), &self.headers).await {
            Some(body) => serde_json::from_value(body)
                .map(Some)
                .map_err(|source| CatalogError::Decode { what, source }),
            None => Ok(None),
        }
    }
}

/// Appends percent-encoded path segments to the API base URL
pub(crate) fn resource_url(base_url: &str, segments: &[&str]) -> Result<Url, CatalogError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
