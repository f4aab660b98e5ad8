//! Storage module for persisting harvested events
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Reconciliation of scraped records against stored events
//! - Run tracking with per-run totals

mod schema;
mod sqlite;
mod traits;

pub use schema::{
    DATE_MAX_CHARS, LOCATION_MAX_CHARS, ORGANIZER_MAX_CHARS, PRICE_MAX_CHARS, TITLE_MAX_CHARS,
};
pub use sqlite::{SqliteStorage, DEFAULT_BATCH_SIZE};
pub use traits::{EventStore, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Opens (creating if needed) the event store with the given batch size
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `batch_size` - Records applied per transaction during an upsert
pub fn open_storage(path: &Path, batch_size: usize) -> Result<SqliteStorage, HarvestError> {
    Ok(SqliteStorage::new(path)?.with_batch_size(batch_size))
}

/// An event row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: i64,
    pub title: String,
    pub date_text: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub price: Option<String>,
    pub source_url: String,
    pub first_seen_at: String,
    pub last_updated_at: String,
}

/// Outcome counts of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errored: usize,
}

impl UpsertSummary {
    /// Records the summary covers
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.errored
    }
}

/// Totals recorded on a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub pages_visited: u32,
    pub records_scraped: usize,
    pub summary: UpsertSummary,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_visited: u32,
    pub records_scraped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub errored: u64,
    pub error_message: Option<String>,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
