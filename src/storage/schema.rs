//! Database schema definitions
//!
//! Column length checks mirror the field caps applied during extraction, so a
//! record that slips past them is rejected by the database on its own.

/// Longest value each capped `events` column accepts, in characters
pub const TITLE_MAX_CHARS: usize = 500;
pub const DATE_MAX_CHARS: usize = 500;
pub const LOCATION_MAX_CHARS: usize = 255;
pub const ORGANIZER_MAX_CHARS: usize = 255;
pub const PRICE_MAX_CHARS: usize = 100;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('running', 'completed', 'failed')),
    pages_visited INTEGER NOT NULL DEFAULT 0,
    records_scraped INTEGER NOT NULL DEFAULT 0,
    inserted INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0,
    errored INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

-- One row per event, identified by its canonical source URL
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(title) <= 500),
    date_text TEXT CHECK (date_text IS NULL OR length(date_text) <= 500),
    location TEXT CHECK (location IS NULL OR length(location) <= 255),
    description TEXT,
    organizer TEXT CHECK (organizer IS NULL OR length(organizer) <= 255),
    price TEXT CHECK (price IS NULL OR length(price) <= 100),
    source_url TEXT NOT NULL UNIQUE CHECK (length(source_url) BETWEEN 1 AND 1000),
    first_seen_at TEXT NOT NULL,
    last_updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_first_seen ON events(first_seen_at);
CREATE INDEX IF NOT EXISTS idx_events_last_updated ON events(last_updated_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
