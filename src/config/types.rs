use serde::Deserialize;
use std::time::Duration;

/// Browser-like user agent sent by default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(rename = "target", default)]
    pub targets: Vec<TargetEntry>,
}

/// Pagination and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of listing pages to visit per target
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Pause after every listing and detail fetch (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Consecutive empty listing pages that end a target's crawl
    #[serde(rename = "max-empty-pages", default = "default_max_empty_pages")]
    pub max_empty_pages: u32,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn default_max_empty_pages() -> u32 {
    3
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_offset_ms")]
    pub backoff_offset_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_offset_ms: default_backoff_offset_ms(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_offset_ms() -> u64 {
    1000
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Records per committed transaction during reconciliation
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    50
}

/// Where the extraction rules come from
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// External rules file; built-in rules are used when absent
    pub path: Option<String>,
}

/// A listing query to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    /// Base listing URL, without the page parameter
    pub url: String,

    /// Overrides `crawler.max-pages` for this target
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}
