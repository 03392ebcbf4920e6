//! Configuration module for Catalog-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every retry, concurrency and filtering knob of the crawler lives here with
//! a documented default.
//!
//! # Example
//!
//! ```no_run
//! use catalog_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Popularity threshold: {}", config.crawler.popularity_threshold);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, CrawlerConfig, OutputConfig, PauseRange, ProvenanceConfig,
    MAX_BACKOFF_BASE, MAX_BACKOFF_SECS,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, SCHEMA_ENV_VAR,
};

pub(crate) use validation::validate_schema_name;
