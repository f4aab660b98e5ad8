//! HTML extraction for listing and detail pages
//!
//! This module contains:
//! - Reloadable selector rule tables
//! - Priority-ordered field extraction
//! - Listing page scanning (event references)
//! - Detail page scanning (event records)

mod detail;
mod field;
mod listing;
pub mod rules;

pub use detail::{parse_detail, DetailScanner};
pub use field::{block_text, element_text, match_first, match_first_with, normalize_text};
pub use listing::{parse_listing, ListingPage, ListingScanner, NO_TITLE};
pub use rules::{load_rules, ExtractionRules, RuleConfig};

use url::Url;

/// An event reference found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    pub title: String,
    /// Canonical address of the event page
    pub address: Url,
}

/// One event as extracted from its detail page
///
/// Absent fields hold the configured sentinel rather than being left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub title: String,
    /// Raw date/time text, kept exactly as the page shows it
    pub date_text: String,
    pub location: String,
    pub description: String,
    pub organizer: String,
    pub price: String,
    /// Canonical source URL, the record's identity
    pub source_url: String,
}
