//! Statistics from the event store
//!
//! This module provides functionality for extracting and displaying
//! store statistics for the `--stats` mode.

use crate::storage::{EventStore, RunRecord, StoredEvent};
use crate::HarvestError;

/// Events listed under "Recently updated" unless asked otherwise
pub const DEFAULT_RECENT_EVENTS: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored events
    pub total_events: u64,

    /// Most recent run, if any run was recorded
    pub latest_run: Option<RunRecord>,

    /// Events first seen during the latest run
    pub new_in_latest_run: u64,

    /// Most recently updated events, newest first
    pub recent_events: Vec<StoredEvent>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The store to query
/// * `recent` - How many recently updated events to include
pub fn load_statistics(
    storage: &dyn EventStore,
    recent: usize,
) -> Result<StoreStatistics, HarvestError> {
    let total_events = storage.count_events()?;
    let latest_run = storage.get_latest_run()?;

    let new_in_latest_run = match &latest_run {
        Some(run) => storage.count_events_first_seen_since(&run.started_at)?,
        None => 0,
    };

    let recent_events = storage.latest_events(recent)?;

    Ok(StoreStatistics {
        total_events,
        latest_run,
        new_in_latest_run,
        recent_events,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Event Store Statistics ===\n");

    println!("Overview:");
    println!("  Total events: {}", stats.total_events);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Pages visited: {}", run.pages_visited);
            println!("  Events scraped: {}", run.records_scraped);
            println!(
                "  Stored: {} inserted, {} updated, {} errored",
                run.inserted, run.updated, run.errored
            );
            println!("  New events this run: {}", stats.new_in_latest_run);
            if let Some(message) = &run.error_message {
                println!("  Error: {}", message);
            }
        }
        None => println!("No harvest runs recorded yet."),
    }

    if !stats.recent_events.is_empty() {
        println!();
        println!("Recently Updated:");
        for event in &stats.recent_events {
            println!("  - {} ({})", event.title, event.source_url);
        }
    }
}
