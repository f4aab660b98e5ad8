//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one HTTP client with a browser-like header set
//! - GET requests with a fixed timeout
//! - Bounded retry with exponential backoff for transient failures
//! - Error classification

use crate::config::HttpConfig;
use crate::crawler::sleep::{Sleeper, TokioSleeper};
use crate::{ConfigError, HarvestError};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Server answered with a non-2xx status
    Status(u16),
    Timeout,
    Connect,
    /// Any other transport or body read error
    Network(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::Timeout => write!(f, "request timeout"),
            Self::Connect => write!(f, "connection failed"),
            Self::Network(message) => write!(f, "{}", message),
        }
    }
}

/// Every attempt for an address failed
#[derive(Debug, Clone, Error)]
#[error("fetch of {url} failed after {attempts} attempt(s): {cause}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    /// Cause of the last attempt's failure
    pub cause: FetchCause,
}

/// Retry schedule for transient failures
///
/// Attempt `n + 1` waits `base_delay * 2^n + offset` after attempt `n`
/// failed, so the defaults wait 2s, 3s, then 5s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub offset: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            offset: Duration::from_millis(config.backoff_offset_ms),
        }
    }

    /// Upper bound on requests per address
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .saturating_add(self.offset)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// The header set mimics a desktop browser; compression is negotiated by the
/// client itself (gzip, brotli, deflate).
///
/// # Example
///
/// ```no_run
/// use event_harvester::config::HttpConfig;
/// use event_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language).map_err(|e| {
            ConfigError::Validation(format!("Invalid accept_language header: {}", e))
        })?,
    );
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;

    Ok(client)
}

/// One HTTP client plus the retry policy, shared by every scanner
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    /// Builds a fetcher that sleeps on the tokio timer
    pub fn new(config: &HttpConfig) -> Result<Self, HarvestError> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        config: &HttpConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: RetryPolicy::from_config(config),
            sleeper,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The sleeper used for backoff, shared with the pagination pacing
    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return the body |
    /// | Any other status | Retry with backoff |
    /// | Timeout / connect / body error | Retry with backoff |
    /// | `max_retries` exhausted | `FetchFailure` with the last cause |
    pub async fn fetch(&self, url: &Url) -> Result<RawDocument, FetchFailure> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let cause = match self.attempt(url).await {
                Ok(document) => return Ok(document),
                Err(cause) => cause,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    "Request failed after {} retries: {} ({})",
                    self.policy.max_retries,
                    url,
                    cause
                );
                return Err(FetchFailure {
                    url: url.to_string(),
                    attempts: attempt,
                    cause,
                });
            }

            let wait = self.policy.delay_for(attempt - 1);
            tracing::warn!(
                "Request failed, retrying in {:?} ({}/{}): {} ({})",
                wait,
                attempt,
                self.policy.max_retries,
                url,
                cause
            );
            self.sleeper.sleep(wait).await;
        }
    }

    /// A single GET without retries
    async fn attempt(&self, url: &Url) -> Result<RawDocument, FetchCause> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchCause::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify)?;

        Ok(RawDocument {
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

fn classify(error: reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else if error.is_connect() {
        FetchCause::Connect
    } else {
        FetchCause::Network(error.to_string())
    }
}
