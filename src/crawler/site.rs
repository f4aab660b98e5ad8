//! The live event directory as an [`EventSource`]

use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::EventSource;
use crate::extract::{DetailScanner, EventRecord, ExtractionRules, ListingRef, ListingScanner};
use async_trait::async_trait;
use url::Url;

/// Fetches listing and detail pages over HTTP and applies the extraction rules
pub struct SiteScanner {
    fetcher: Fetcher,
    rules: ExtractionRules,
}

impl SiteScanner {
    pub fn new(fetcher: Fetcher, rules: ExtractionRules) -> Self {
        Self { fetcher, rules }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }
}

#[async_trait]
impl EventSource for SiteScanner {
    async fn listings(&self, page_url: &Url) -> Vec<ListingRef> {
        ListingScanner::new(&self.fetcher, &self.rules.listing)
            .scan(page_url)
            .await
    }

    async fn detail(&self, address: &Url) -> Option<EventRecord> {
        DetailScanner::new(&self.fetcher, &self.rules)
            .scan(address)
            .await
    }
}
