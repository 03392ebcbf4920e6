//! HTTP fetcher implementation
//!
//! This module issues every catalog request of a crawl, including:
//! - Building the shared HTTP client
//! - Admission through the global request gate
//! - Exponential backoff with jitter before each attempt
//! - Honoring HTTP 429 `Retry-After`
//! - Classifying failures into retry / give-up decisions

use crate::config::{CrawlerConfig, PauseRange, MAX_BACKOFF_SECS};
use crate::crawler::gate::AdmissionGate;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Builds the HTTP client shared by every request of a run
///
/// # Arguments
///
/// * `config` - The crawler configuration (timeout and pool size)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.request_timeout())
        .pool_max_idle_per_host(config.max_idle_connections)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retry and backoff parameters of the fetcher
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per URL, counting rate-limited ones
    pub max_retries: u32,
    pub backoff_base: f64,
    /// Duration of one backoff unit; the delay before attempt `n` is
    /// `backoff_scale * backoff_base^(n-1)` plus jitter
    pub backoff_scale: Duration,
    pub jitter: PauseRange,
    /// Wait used when a 429 carries no usable `Retry-After`
    pub default_retry_after: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            backoff_scale: Duration::from_millis(config.backoff_scale_ms),
            jitter: PauseRange::from_millis(config.jitter_min_ms, config.jitter_max_ms),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }

    /// Deterministic part of the delay before `attempt` (1-based)
    ///
    /// Saturates at [`MAX_BACKOFF_SECS`] instead of overflowing.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let cap = Duration::from_secs(MAX_BACKOFF_SECS);
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_scale.as_secs_f64() * self.backoff_base.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(cap)
            .min(cap)
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + self.jitter.sample()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Counters describing what the fetcher did during a run
#[derive(Debug, Default)]
pub struct FetchStats {
    attempts: AtomicU64,
    succeeded: AtomicU64,
    rate_limited: AtomicU64,
    abandoned: AtomicU64,
    failed_permanently: AtomicU64,
}

impl FetchStats {
    /// HTTP attempts started
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// 429 responses received
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Resources given up on after a non-retryable status
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Resources given up on after exhausting every attempt
    pub fn failed_permanently(&self) -> u64 {
        self.failed_permanently.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Why a single attempt did not produce a JSON body
#[derive(Debug)]
enum AttemptError {
    /// HTTP 429; retried after the server-supplied delay
    RateLimited { retry_after: Duration },
    /// Any other non-200 status; not retried
    Status(StatusCode),
    /// Connection, timeout, DNS or body read failure; retried
    Transport(reqwest::Error),
    /// Anything else, such as a body that is not JSON; retried
    Unexpected(String),
}

/// GET-with-retry client bounded by the run's admission gate
///
/// Cloning is cheap: clones share the HTTP connection pool, the gate and
/// the statistics.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    client: Client,
    gate: AdmissionGate,
    policy: RetryPolicy,
    stats: Arc<FetchStats>,
}

impl RateLimitedFetcher {
    pub fn new(client: Client, gate: AdmissionGate, policy: RetryPolicy) -> Self {
        Self {
            client,
            gate,
            policy,
            stats: Arc::new(FetchStats::default()),
        }
    }

    /// Builds a fetcher, its client and its gate from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client(config)?,
            AdmissionGate::new(config.max_concurrent_requests as usize),
            RetryPolicy::from_config(config),
        ))
    }

    /// The underlying HTTP client, for requests that must not be retried
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Fetches a URL and decodes its JSON body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return the body |
    /// | HTTP 429 | Sleep `Retry-After` seconds, next attempt |
    /// | Other status | Give up immediately |
    /// | Transport error | Next attempt |
    /// | Undecodable body | Next attempt |
    ///
    /// Retryable failures are logged at `warn`; running out of attempts is
    /// logged once at `error` with `event = "fetch.failed_permanently"`.
    ///
    /// Every attempt first takes a gate permit and sleeps the backoff delay;
    /// the permit is held until the attempt (including any 429 wait) ends.
    ///
    /// # Returns
    ///
    /// * `Some(Value)` - The decoded body
    /// * `None` - The resource could not be obtained; the cause has been logged
    pub async fn fetch(&self, url: &str, headers: &HeaderMap) -> Option<Value> {
        let max_retries = self.policy.max_retries;

        for attempt in 1..=max_retries {
            let Some(_permit) = self.gate.acquire().await else {
                tracing::error!("Admission gate closed, dropping {}", url);
                return None;
            };

            tokio::time::sleep(self.policy.delay_before(attempt)).await;
            FetchStats::bump(&self.stats.attempts);

            match self.attempt(url, headers).await {
                Ok(body) => {
                    FetchStats::bump(&self.stats.succeeded);
                    return Some(body);
                }
                Err(AttemptError::RateLimited { retry_after }) => {
                    FetchStats::bump(&self.stats.rate_limited);
                    tracing::warn!(
                        "Rate limited (429) on {}. Retrying in {:?} | Attempt {}/{}",
                        url,
                        retry_after,
                        attempt,
                        max_retries
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(AttemptError::Status(status)) => {
                    FetchStats::bump(&self.stats.abandoned);
                    tracing::error!(
                        "Error {} on {} | Attempt {}/{}",
                        status.as_u16(),
                        url,
                        attempt,
                        max_retries
                    );
                    return None;
                }
                Err(AttemptError::Transport(e)) => {
                    tracing::warn!(
                        "Client error on {}: {} | Attempt {}/{}",
                        url,
                        e,
                        attempt,
                        max_retries
                    );
                }
                Err(AttemptError::Unexpected(message)) => {
                    tracing::warn!(
                        "Unexpected error on {}: {} | Attempt {}/{}",
                        url,
                        message,
                        attempt,
                        max_retries
                    );
                }
            }
        }

        FetchStats::bump(&self.stats.failed_permanently);
        tracing::error!(
            event = "fetch.failed_permanently",
            "Failed to fetch {} after {} attempts",
            url,
            max_retries
        );
        None
    }

    async fn attempt(&self, url: &str, headers: &HeaderMap) -> Result<Value, AttemptError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after =
                parse_retry_after(response.headers()).unwrap_or(self.policy.default_retry_after);
            return Err(AttemptError::RateLimited { retry_after });
        }

        if status != StatusCode::OK {
            return Err(AttemptError::Status(status));
        }

        let body = response.bytes().await.map_err(AttemptError::Transport)?;
        serde_json::from_slice(&body)
            .map_err(|e| AttemptError::Unexpected(format!("invalid JSON body: {}", e)))
    }
}

/// Reads `Retry-After` as a whole number of seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
