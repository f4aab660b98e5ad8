//! Storage traits and error types
//!
//! This module defines the trait interface for the event store and
//! associated error types.

use crate::extract::EventRecord;
use crate::storage::{RunRecord, RunTotals, StoredEvent, UpsertSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for event store implementations
///
/// Records are keyed by their canonical source URL. The store only ever
/// inserts and updates events; nothing in a harvest deletes them.
pub trait EventStore {
    // ===== Run Management =====

    /// Creates a new harvest run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration and rules files
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed and records its totals
    fn complete_run(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()>;

    /// Marks a run as failed with the error that ended it
    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()>;

    // ===== Event Reconciliation =====

    /// Inserts new events and overwrites known ones
    ///
    /// Each record is applied on its own; a record the database rejects is
    /// rolled back alone and counted as errored. Only a failure of the
    /// surrounding transaction machinery is returned as an error.
    fn upsert_events(&mut self, records: &[EventRecord]) -> StorageResult<UpsertSummary>;

    /// Gets a stored event by its source URL
    fn get_event(&self, source_url: &str) -> StorageResult<Option<StoredEvent>>;

    // ===== Statistics =====

    /// Counts all stored events
    fn count_events(&self) -> StorageResult<u64>;

    /// Counts events first seen at or after the given timestamp
    fn count_events_first_seen_since(&self, timestamp: &str) -> StorageResult<u64>;

    /// Most recently updated events, newest first
    fn latest_events(&self, limit: usize) -> StorageResult<Vec<StoredEvent>>;

    /// Every stored event in insertion order
    fn list_events(&self) -> StorageResult<Vec<StoredEvent>>;
}
