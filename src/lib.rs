//! Event Harvester: a polite event-directory crawler
//!
//! This crate walks the paginated listing pages of an event directory, extracts
//! one structured record per event detail page, and reconciles the records into
//! a SQLite store keyed by each event's canonical source URL.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction rule error: {0}")]
    Rules(#[from] RuleError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

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

/// Errors raised while loading or compiling extraction rules
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rules TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid selector for {field}: '{selector}'")]
    InvalidSelector { field: String, selector: String },

    #[error("Rule list for {0} is empty")]
    EmptyRuleList(String),

    #[error("max-length {max_length} for {field} exceeds the stored column limit of {limit}")]
    MaxLengthTooLarge {
        field: String,
        max_length: usize,
        limit: usize,
    },
}

// Re-export commonly used types
pub use config::Config;
pub use extract::{EventRecord, ListingRef};
pub use storage::{SqliteStorage, UpsertSummary};
pub use crate::url::{page_url, resolve_url};
