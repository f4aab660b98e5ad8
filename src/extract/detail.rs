//! Detail page scanning
//!
//! Every field starts at its sentinel and is overwritten only by a rule that
//! matched, so a scanned record is always complete.

use crate::crawler::Fetcher;
use crate::extract::field::{block_text, match_first, match_first_with};
use crate::extract::rules::ExtractionRules;
use crate::extract::EventRecord;
use scraper::Html;
use url::Url;

/// Extracts an event record from detail page HTML
///
/// # Arguments
///
/// * `html` - The detail page body
/// * `address` - Canonical address of the event, stored as its identity
/// * `rules` - Compiled extraction rules
pub fn parse_detail(html: &str, address: &Url, rules: &ExtractionRules) -> EventRecord {
    let document = Html::parse_document(html);
    let detail = &rules.detail;
    let or_missing = |value: Option<String>| value.unwrap_or_else(|| rules.missing_value.clone());

    EventRecord {
        title: match_first(&document, &detail.title)
            .unwrap_or_else(|| rules.missing_title.clone()),
        date_text: or_missing(match_first(&document, &detail.date)),
        location: or_missing(match_first(&document, &detail.location)),
        description: or_missing(match_first_with(&document, &detail.description, block_text)),
        organizer: or_missing(match_first(&document, &detail.organizer)),
        price: or_missing(match_first(&document, &detail.price)),
        source_url: address.as_str().to_string(),
    }
}

/// Scans event detail pages through the shared fetcher
pub struct DetailScanner<'a> {
    fetcher: &'a Fetcher,
    rules: &'a ExtractionRules,
}

impl<'a> DetailScanner<'a> {
    pub fn new(fetcher: &'a Fetcher, rules: &'a ExtractionRules) -> Self {
        Self { fetcher, rules }
    }

    /// Fetches and scans one event page, None when the page could not be fetched
    pub async fn scan(&self, address: &Url) -> Option<EventRecord> {
        tracing::debug!("Scraping details: {}", address);

        match self.fetcher.fetch(address).await {
            Ok(document) => Some(parse_detail(&document.body, address, self.rules)),
            Err(failure) => {
                tracing::warn!("Detail page unavailable: {}", failure);
                None
            }
        }
    }
}
