//! Seed artist discovery by keyword search
//!
//! Searches run one after another and bypass the retrying fetcher: any
//! failure here aborts the run rather than continuing with a partial seed set.

use crate::crawler::endpoints::resource_url;
use crate::model::api::ArtistSearch;
use crate::CatalogError;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::collections::BTreeSet;

/// Parameters of one seed discovery pass
#[derive(Debug, Clone)]
pub struct SeedSearch<'a> {
    pub base_url: &'a str,
    pub terms: &'a [String],
    pub page_size: u32,
    /// Artists must be strictly more popular than this to become seeds
    pub popularity_threshold: u32,
}

/// Collects the ids of popular artists matching any of the search terms
///
/// # Returns
///
/// * `Ok(BTreeSet<String>)` - Deduplicated seed artist ids
/// * `Err(CatalogError::SeedDiscovery)` - A search failed; the run must stop
pub async fn discover_seeds(
    client: &Client,
    headers: &HeaderMap,
    search: &SeedSearch<'_>,
) -> Result<BTreeSet<String>, CatalogError> {
    let mut artist_ids = BTreeSet::new();

    for term in search.terms {
        let results = search_artists(client, headers, search, term)
            .await
            .map_err(|e| CatalogError::SeedDiscovery {
                term: term.clone(),
                message: e.to_string(),
            })?;

        let before = artist_ids.len();
        artist_ids.extend(
            results
                .artists
                .items
                .into_iter()
                .filter(|hit| !hit.id.trim().is_empty())
                .filter(|hit| hit.popularity > search.popularity_threshold)
                .map(|hit| hit.id),
        );

        tracing::debug!(
            "Search '{}' added {} new seed artists",
            term,
            artist_ids.len() - before
        );
    }

    tracing::info!(
        "Discovered {} seed artists from {} search terms",
        artist_ids.len(),
        search.terms.len()
    );

    Ok(artist_ids)
}

async fn search_artists(
    client: &Client,
    headers: &HeaderMap,
    search: &SeedSearch<'_>,
    term: &str,
) -> Result<ArtistSearch, CatalogError> {
    let mut url = resource_url(search.base_url, &["search"])?;
    url.query_pairs_mut()
        .append_pair("q", term)
        .append_pair("type", "artist")
        .append_pair("limit", &search.page_size.to_string());

    let response = client
        .get(url.as_str())
        .headers(headers.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| CatalogError::Http {
            url: url.to_string(),
            source,
        })?;

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| CatalogError::Decode {
        what: "artist search",
        source,
    })
}
