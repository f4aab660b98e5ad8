//! Paginated crawl of one listing query
//!
//! Pages are visited in increasing order until `max_pages` is reached or a
//! run of `max_empty_pages` consecutive empty pages signals the end of the
//! results. Requests are strictly sequential; pacing is a plain pause after
//! every listing fetch and every detail fetch, skipped only when the crawl
//! ends right there.

use crate::crawler::dedup::Deduplicator;
use crate::crawler::sleep::Sleeper;
use crate::extract::{EventRecord, ListingRef};
use crate::url::page_url;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Where listings and event records come from
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Event references on one listing page; empty when the page has none or failed
    async fn listings(&self, page_url: &Url) -> Vec<ListingRef>;

    /// The record behind one event address; None when it could not be fetched
    async fn detail(&self, address: &Url) -> Option<EventRecord>;
}

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every page up to `max_pages` was visited
    MaxPages,
    /// `max_empty_pages` consecutive pages yielded nothing
    EmptyPages,
}

/// Result of crawling one listing query
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<EventRecord>,
    pub pages_visited: u32,
    /// Listings skipped because an earlier page already produced them
    pub duplicates_skipped: usize,
    /// Detail pages that could not be fetched
    pub failed_details: usize,
    pub stop_reason: StopReason,
}

/// Drives the listing and detail scans across the pages of one query
pub struct PaginationDriver<'a, S: EventSource + ?Sized> {
    source: &'a S,
    sleeper: &'a dyn Sleeper,
    max_empty_pages: u32,
}

impl<'a, S: EventSource + ?Sized> PaginationDriver<'a, S> {
    pub fn new(source: &'a S, sleeper: &'a dyn Sleeper, max_empty_pages: u32) -> Self {
        Self {
            source,
            sleeper,
            max_empty_pages,
        }
    }

    /// Crawls pages `1..=max_pages` of `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Listing query without the page parameter
    /// * `max_pages` - Last page index to visit
    /// * `delay` - Pause after each listing and detail fetch that is followed by another request
    pub async fn crawl(&self, base_url: &str, max_pages: u32, delay: Duration) -> CrawlOutcome {
        tracing::info!("Starting paginated scraping from: {}", base_url);
        tracing::info!(
            "Target: {} pages with {:?} delay between requests",
            max_pages,
            delay
        );

        let mut outcome = CrawlOutcome {
            records: Vec::new(),
            pages_visited: 0,
            duplicates_skipped: 0,
            failed_details: 0,
            stop_reason: StopReason::MaxPages,
        };
        let mut seen = Deduplicator::new();
        let mut consecutive_empty_pages = 0;

        for page in 1..=max_pages {
            let address = page_url(base_url, page);
            tracing::info!("Scraping page {}/{}: {}", page, max_pages, address);
            outcome.pages_visited = page;

            let listings = match Url::parse(&address) {
                Ok(url) => self.source.listings(&url).await,
                Err(e) => {
                    tracing::warn!("Skipping unparseable page address {}: {}", address, e);
                    Vec::new()
                }
            };

            if listings.is_empty() {
                consecutive_empty_pages += 1;
                tracing::warn!(
                    "Page {} returned no events (consecutive empty: {})",
                    page,
                    consecutive_empty_pages
                );

                if consecutive_empty_pages >= self.max_empty_pages {
                    tracing::info!(
                        "Stopping after {} consecutive empty pages",
                        consecutive_empty_pages
                    );
                    outcome.stop_reason = StopReason::EmptyPages;
                    break;
                }
            } else {
                consecutive_empty_pages = 0;
            }

            let listed = listings.len();
            let fresh: Vec<ListingRef> = listings
                .into_iter()
                .filter(|listing| {
                    let new = seen.insert(&listing.address);
                    if !new {
                        tracing::debug!("Skipping duplicate: {}", listing.title);
                    }
                    new
                })
                .collect();
            outcome.duplicates_skipped += listed - fresh.len();

            // pause after the listing fetch unless nothing follows it
            if !fresh.is_empty() || page < max_pages {
                self.sleeper.sleep(delay).await;
            }

            let mut new_events = 0;
            for listing in fresh {
                match self.source.detail(&listing.address).await {
                    Some(record) => {
                        tracing::info!(
                            "[{}] Scraped: {}",
                            outcome.records.len() + 1,
                            record.title
                        );
                        outcome.records.push(record);
                        new_events += 1;
                    }
                    None => {
                        tracing::warn!("Failed to scrape: {}", listing.title);
                        outcome.failed_details += 1;
                    }
                }

                self.sleeper.sleep(delay).await;
            }

            if listed > 0 {
                tracing::info!(
                    "Page {} summary: {} new events, {} total",
                    page,
                    new_events,
                    outcome.records.len()
                );
            }
        }

        tracing::info!(
            "Scraping complete: {} events from {} pages ({:?})",
            outcome.records.len(),
            outcome.pages_visited,
            outcome.stop_reason
        );

        outcome
    }
}
