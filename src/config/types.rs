use serde::Deserialize;
use std::time::Duration;

/// Upper bound on the deterministic backoff before any single attempt
pub const MAX_BACKOFF_SECS: u64 = 3600;

/// Upper bound on `backoff-base`
pub const MAX_BACKOFF_BASE: f64 = 10.0;

/// Main configuration structure for Catalog-Ripple
///
/// Every section and key is optional; omitted values fall back to the
/// defaults documented on each field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub crawler: CrawlerConfig,
    pub provenance: ProvenanceConfig,
    pub output: OutputConfig,
}

/// Streaming API endpoints and seed search terms
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Root of the catalog API (default `https://api.spotify.com/v1`)
    pub base_url: String,

    /// Client-credentials token endpoint
    pub token_url: String,

    /// Keywords searched to discover seed artists
    pub search_terms: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            search_terms: ["a", "e", "i", "m", "pop", "rock"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of requests in flight across the whole run (default 4)
    pub max_concurrent_requests: u32,

    /// Attempts per URL before giving up (default 3)
    pub max_retries: u32,

    /// Exponent base of the pre-attempt backoff (default 2.0)
    pub backoff_base: f64,

    /// Length of one backoff unit in milliseconds (default 1000)
    pub backoff_scale_ms: u64,

    /// Lower bound of the random jitter added to each backoff (default 100)
    pub jitter_min_ms: u64,

    /// Upper bound of the random jitter added to each backoff (default 500)
    pub jitter_max_ms: u64,

    /// Wait applied on HTTP 429 when Retry-After is missing (default 1)
    pub default_retry_after_secs: u64,

    /// Total timeout of a single HTTP request (default 60)
    pub request_timeout_secs: u64,

    /// Idle connections kept per host (default 10)
    pub max_idle_connections: usize,

    /// Artists at or below this popularity are dropped (default 80)
    pub popularity_threshold: u32,

    /// Albums requested per artist (default 5)
    pub album_page_size: u32,

    /// Artists requested per search term (default 50)
    pub search_page_size: u32,

    /// Pause after an artist's own fetch (default 200..=500 ms)
    pub artist_pause_min_ms: u64,
    pub artist_pause_max_ms: u64,

    /// Pause after each album (default 300..=600 ms)
    pub album_pause_min_ms: u64,
    pub album_pause_max_ms: u64,

    /// Optional cap on artist traversals running at once (default unbounded)
    pub max_concurrent_artists: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            max_retries: 3,
            backoff_base: 2.0,
            backoff_scale_ms: 1000,
            jitter_min_ms: 100,
            jitter_max_ms: 500,
            default_retry_after_secs: 1,
            request_timeout_secs: 60,
            max_idle_connections: 10,
            popularity_threshold: 80,
            album_page_size: 5,
            search_page_size: 50,
            artist_pause_min_ms: 200,
            artist_pause_max_ms: 500,
            album_pause_min_ms: 300,
            album_pause_max_ms: 600,
            max_concurrent_artists: None,
        }
    }
}

impl CrawlerConfig {
    pub fn artist_pause(&self) -> PauseRange {
        PauseRange::from_millis(self.artist_pause_min_ms, self.artist_pause_max_ms)
    }

    pub fn album_pause(&self) -> PauseRange {
        PauseRange::from_millis(self.album_pause_min_ms, self.album_pause_max_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// An inclusive range of random sleep durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRange {
    pub min: Duration,
    pub max: Duration,
}

impl PauseRange {
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Draws a duration uniformly from the range
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Provenance labels stamped onto every record
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProvenanceConfig {
    pub source: String,
    pub extractor: String,
    pub data_version: String,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            source: "Spotify API v1".to_string(),
            extractor: env!("CARGO_PKG_NAME").to_string(),
            data_version: "1.0".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving artists.json, albums.json and tracks.json
    pub json_dir: String,

    /// Whether to write the JSON snapshots after a crawl
    pub write_json: bool,

    /// Whether to replace-load the database tables after a crawl
    pub load_database: bool,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Schema holding the artists, albums and tracks tables
    pub schema: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_dir: ".".to_string(),
            write_json: true,
            load_database: false,
            database_path: "./catalog.db".to_string(),
            schema: "main".to_string(),
        }
    }
}
