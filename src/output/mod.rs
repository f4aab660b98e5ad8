//! Output module for reporting on the event store
//!
//! This module handles:
//! - Loading statistics from the store
//! - Printing them, or the full event list, for the command line

pub mod events;
pub mod stats;

pub use events::{format_event, print_events};
pub use stats::{load_statistics, print_statistics, StoreStatistics, DEFAULT_RECENT_EVENTS};
