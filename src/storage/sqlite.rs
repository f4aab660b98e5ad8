//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the EventStore trait.

use crate::extract::EventRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{EventStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunTotals, StoredEvent, UpsertSummary};
use crate::HarvestError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Records applied per transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 50;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, pages_visited,
     records_scraped, inserted, updated, errored, error_message";

const EVENT_COLUMNS: &str = "id, title, date_text, location, description, organizer, price,
     source_url, first_seen_at, last_updated_at";

/// What happened to a single record
enum UpsertAction {
    Inserted,
    Updated,
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    batch_size: usize,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Sets how many records are committed per transaction (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// [`EventStore::upsert_events`] with an explicit clock
    ///
    /// Every record in one call shares the same timestamp. Records are
    /// applied in batches of `batch_size`, each batch in one transaction and
    /// each record inside its own savepoint.
    pub fn upsert_events_at(
        &mut self,
        records: &[EventRecord],
        now: DateTime<Utc>,
    ) -> StorageResult<UpsertSummary> {
        let timestamp = format_timestamp(now);
        let mut summary = UpsertSummary::default();
        let batch_count = records.len().div_ceil(self.batch_size);

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            let mut tx = self.conn.transaction()?;

            for record in batch {
                let savepoint = tx.savepoint()?;

                match upsert_one(&savepoint, record, &timestamp) {
                    Ok(action) => {
                        savepoint.commit()?;
                        match action {
                            UpsertAction::Inserted => {
                                tracing::debug!("Inserted: {}", record.source_url);
                                summary.inserted += 1;
                            }
                            UpsertAction::Updated => {
                                tracing::debug!("Updated: {}", record.source_url);
                                summary.updated += 1;
                            }
                        }
                    }
                    Err(e) => {
                        // dropping the savepoint rolls this record back
                        tracing::error!(
                            "Failed to store event '{}' ({}): {}",
                            record.title,
                            record.source_url,
                            e
                        );
                        summary.errored += 1;
                    }
                }
            }

            tx.commit()?;
            tracing::debug!(
                "Committed batch {}/{} ({} records)",
                batch_index + 1,
                batch_count,
                batch.len()
            );
        }

        tracing::info!(
            "Reconciled {} records: {} inserted, {} updated, {} errored",
            summary.total(),
            summary.inserted,
            summary.updated,
            summary.errored
        );

        Ok(summary)
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn upsert_one(
    conn: &Connection,
    record: &EventRecord,
    timestamp: &str,
) -> rusqlite::Result<UpsertAction> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM events WHERE source_url = ?1",
            params![record.source_url],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE events SET title = ?1, date_text = ?2, location = ?3, description = ?4,
                 organizer = ?5, price = ?6, last_updated_at = ?7 WHERE id = ?8",
                params![
                    record.title,
                    record.date_text,
                    record.location,
                    record.description,
                    record.organizer,
                    record.price,
                    timestamp,
                    id
                ],
            )?;
            Ok(UpsertAction::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO events (title, date_text, location, description, organizer, price,
                 source_url, first_seen_at, last_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    record.title,
                    record.date_text,
                    record.location,
                    record.description,
                    record.organizer,
                    record.price,
                    record.source_url,
                    timestamp
                ],
            )?;
            Ok(UpsertAction::Inserted)
        }
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        pages_visited: row.get(5)?,
        records_scraped: row.get::<_, i64>(6)? as u64,
        inserted: row.get::<_, i64>(7)? as u64,
        updated: row.get::<_, i64>(8)? as u64,
        errored: row.get::<_, i64>(9)? as u64,
        error_message: row.get(10)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    Ok(StoredEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        date_text: row.get(2)?,
        location: row.get(3)?,
        description: row.get(4)?,
        organizer: row.get(5)?,
        price: row.get(6)?,
        source_url: row.get(7)?,
        first_seen_at: row.get(8)?,
        last_updated_at: row.get(9)?,
    })
}

impl EventStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()> {
        let now = format_timestamp(Utc::now());
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_visited = ?3,
             records_scraped = ?4, inserted = ?5, updated = ?6, errored = ?7
             WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                totals.pages_visited,
                totals.records_scraped as i64,
                totals.summary.inserted as i64,
                totals.summary.updated as i64,
                totals.summary.errored as i64,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()> {
        let now = format_timestamp(Utc::now());
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, message, run_id],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Event Reconciliation =====

    fn upsert_events(&mut self, records: &[EventRecord]) -> StorageResult<UpsertSummary> {
        self.upsert_events_at(records, Utc::now())
    }

    fn get_event(&self, source_url: &str) -> StorageResult<Option<StoredEvent>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {} FROM events WHERE source_url = ?1", EVENT_COLUMNS),
                params![source_url],
                event_from_row,
            )
            .optional()?;

        Ok(event)
    }

    // ===== Statistics =====

    fn count_events(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_events_first_seen_since(&self, timestamp: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE first_seen_at >= ?1",
            params![timestamp],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn latest_events(&self, limit: usize) -> StorageResult<Vec<StoredEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events ORDER BY last_updated_at DESC, id DESC LIMIT ?1",
            EVENT_COLUMNS
        ))?;

        let events = stmt
            .query_map(params![limit as i64], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn list_events(&self) -> StorageResult<Vec<StoredEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM events ORDER BY id", EVENT_COLUMNS))?;

        let events = stmt
            .query_map([], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }
}
