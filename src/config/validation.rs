use crate::config::types::{
    ApiConfig, Config, CrawlerConfig, OutputConfig, MAX_BACKOFF_BASE, MAX_BACKOFF_SECS,
};
use crate::ConfigError;
use url::Url;

/// Largest page size the catalog API accepts for search and album listings
const MAX_PAGE_SIZE: u32 = 50;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates endpoints and search terms
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("token-url", &config.token_url)?;

    if config.search_terms.is_empty() {
        return Err(ConfigError::Validation(
            "search-terms must contain at least one term".to_string(),
        ));
    }

    if let Some(blank) = config.search_terms.iter().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "search-terms cannot contain blank entries, got '{}'",
            blank
        )));
    }

    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", key, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if !config.backoff_base.is_finite() || !(1.0..=MAX_BACKOFF_BASE).contains(&config.backoff_base)
    {
        return Err(ConfigError::Validation(format!(
            "backoff-base must be between 1 and {}, got {}",
            MAX_BACKOFF_BASE, config.backoff_base
        )));
    }

    let worst_case_secs = (config.backoff_scale_ms as f64 / 1000.0)
        * config
            .backoff_base
            .powi(config.max_retries.saturating_sub(1).min(16) as i32);
    if worst_case_secs > MAX_BACKOFF_SECS as f64 {
        return Err(ConfigError::Validation(format!(
            "backoff before the last attempt would be {:.0}s, more than {}s; \
             lower backoff-scale-ms, backoff-base or max-retries",
            worst_case_secs, MAX_BACKOFF_SECS
        )));
    }

    validate_range("jitter", config.jitter_min_ms, config.jitter_max_ms)?;
    validate_range(
        "artist-pause",
        config.artist_pause_min_ms,
        config.artist_pause_max_ms,
    )?;
    validate_range(
        "album-pause",
        config.album_pause_min_ms,
        config.album_pause_max_ms,
    )?;

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.popularity_threshold > 100 {
        return Err(ConfigError::Validation(format!(
            "popularity-threshold must be between 0 and 100, got {}",
            config.popularity_threshold
        )));
    }

    for (key, size) in [
        ("album-page-size", config.album_page_size),
        ("search-page-size", config.search_page_size),
    ] {
        if size < 1 || size > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                key, MAX_PAGE_SIZE, size
            )));
        }
    }

    if config.max_concurrent_artists == Some(0) {
        return Err(ConfigError::Validation(
            "max-concurrent-artists must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(key: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{}-min-ms ({}) cannot exceed {}-max-ms ({})",
            key, min, key, max
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_dir.is_empty() {
        return Err(ConfigError::Validation(
            "json-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    validate_schema_name(&config.schema)
}

/// Schema names are spliced into SQL, so only plain identifiers are accepted
pub(crate) fn validate_schema_name(schema: &str) -> Result<(), ConfigError> {
    let mut chars = schema.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if !valid {
        return Err(ConfigError::Validation(format!(
            "schema must be a plain identifier, got '{}'",
            schema
        )));
    }

    if schema.eq_ignore_ascii_case("temp") {
        return Err(ConfigError::Validation(
            "schema 'temp' is reserved".to_string(),
        ));
    }

    Ok(())
}
