//! Crawler module for catalog fetching and record assembly
//!
//! This module contains the core crawling logic, including:
//! - Client-credentials authentication
//! - HTTP fetching with retry, backoff and a global request cap
//! - Typed endpoints for artists, albums and tracks
//! - Seed artist discovery
//! - Overall crawl coordination

mod auth;
mod coordinator;
mod endpoints;
mod fetcher;
mod gate;
mod seeds;

pub use auth::{request_token, AccessToken, Credentials};
pub use coordinator::{
    ArtistOutcome, Collector, Coordinator, CrawlOutput, CrawlReport, CrawlSummary,
};
pub use endpoints::CatalogApi;
pub use fetcher::{build_http_client, FetchStats, RateLimitedFetcher, RetryPolicy};
pub use gate::{AdmissionGate, GatePermit};
pub use seeds::{discover_seeds, SeedSearch};

use crate::config::Config;
use crate::model::Provenance;
use crate::CatalogError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and the request gate
/// 2. Exchange the credentials for a bearer token
/// 3. Stamp the run's provenance metadata
/// 4. Discover seed artists by keyword search
/// 5. Crawl every seed artist's albums and tracks
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `credentials` - API client id and secret
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed; individual missing entities are simply absent
/// * `Err(CatalogError)` - Authentication or seed discovery failed
///
/// # Example
///
/// ```no_run
/// use catalog_ripple::config::load_config;
/// use catalog_ripple::crawler::{crawl, Credentials};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("catalog.toml"))?;
/// let report = crawl(&config, &Credentials::from_env()?).await?;
/// println!("{} artists", report.output.artists.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, credentials: &Credentials) -> Result<CrawlReport, CatalogError> {
    let fetcher = RateLimitedFetcher::from_config(&config.crawler)?;

    let token = request_token(fetcher.client(), &config.api.token_url, credentials).await?;
    let headers = token.auth_headers()?;
    let provenance = Provenance::now(&config.provenance);

    let seeds = discover_seeds(
        fetcher.client(),
        &headers,
        &SeedSearch {
            base_url: &config.api.base_url,
            terms: &config.api.search_terms,
            page_size: config.crawler.search_page_size,
            popularity_threshold: config.crawler.popularity_threshold,
        },
    )
    .await?;

    let api = CatalogApi::new(
        fetcher,
        &config.api.base_url,
        headers,
        config.crawler.album_page_size,
    );

    Ok(Coordinator::new(api, provenance, &config.crawler)
        .run(seeds)
        .await)
}
