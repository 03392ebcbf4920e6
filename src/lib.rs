//! Catalog-Ripple: a polite music catalog crawler
//!
//! This crate walks a music-streaming API from a set of seed artists out to
//! their albums and tracks, under a global request cap with retry and
//! backoff, and hands the assembled records to JSON and SQLite sinks.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Ripple operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected {what} payload: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Seed discovery failed for term '{term}': {message}")]
    SeedDiscovery { term: String, message: String },

    #[error("Artist task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Ripple operations
pub type Result<T> = std::result::Result<T, CatalogError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutput, FetchStats};
pub use model::{Album, Artist, Provenance, Track};
