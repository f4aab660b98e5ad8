//! Listing page scanning
//!
//! Card selectors are a page-level fallback chain: the first selector that
//! matches anything on the page is used for every card on that page, the
//! rest are never consulted.

use crate::crawler::Fetcher;
use crate::extract::field::element_text;
use crate::extract::rules::ListingRules;
use crate::extract::ListingRef;
use crate::url::{is_item_link, resolve_url};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// Title recorded for cards without any heading-like text
pub const NO_TITLE: &str = "No title found";

/// Longest body excerpt logged for pages no card rule matched
const EXCERPT_CHARS: usize = 500;

/// Result of scanning one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Event references in document order, unique by address
    pub refs: Vec<ListingRef>,

    /// Card selector that matched, None when the page matched nothing
    pub matched_rule: Option<String>,

    /// Cards discarded because their link was not an event link
    pub rejected: usize,
}

/// Extracts event references from listing page HTML
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `page_url` - The address the page was fetched from, for resolving links
/// * `rules` - Compiled listing rules
pub fn parse_listing(html: &str, page_url: &Url, rules: &ListingRules) -> ListingPage {
    let document = Html::parse_document(html);

    let Some((rule, cards)) = rules.cards.iter().find_map(|rule| {
        let cards: Vec<ElementRef> = document.select(&rule.selector).collect();
        if cards.is_empty() {
            None
        } else {
            Some((rule, cards))
        }
    }) else {
        return ListingPage::default();
    };

    tracing::debug!(
        "Found {} cards using selector: {}",
        cards.len(),
        rule.source
    );

    let mut page = ListingPage {
        matched_rule: Some(rule.source.clone()),
        ..ListingPage::default()
    };
    let mut seen = HashSet::new();

    for card in cards {
        let Some(address) = card
            .value()
            .attr("href")
            .and_then(|href| resolve_url(href, page_url))
        else {
            page.rejected += 1;
            continue;
        };

        if !is_item_link(&address, &rules.item_link_marker, rules.min_link_length) {
            page.rejected += 1;
            continue;
        }

        if !seen.insert(address.as_str().to_string()) {
            continue;
        }

        let title = card_title(card, rules);
        tracing::trace!("Found listing: {} -> {}", title, address);
        page.refs.push(ListingRef { title, address });
    }

    page
}

/// Title of a card: nested heading first, then a heading in the parent element
fn card_title(card: ElementRef<'_>, rules: &ListingRules) -> String {
    let nested = card.select(&rules.title).next();
    let from_parent = || {
        card.parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| parent.select(&rules.parent_title).next())
    };

    nested
        .or_else(from_parent)
        .map(element_text)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Scans listing pages through the shared fetcher
pub struct ListingScanner<'a> {
    fetcher: &'a Fetcher,
    rules: &'a ListingRules,
}

impl<'a> ListingScanner<'a> {
    pub fn new(fetcher: &'a Fetcher, rules: &'a ListingRules) -> Self {
        Self { fetcher, rules }
    }

    /// Fetches and scans one listing page
    ///
    /// A failed fetch and a page no card rule matches both come back as an
    /// empty list; the caller counts either as an empty page.
    pub async fn scan(&self, page_url: &Url) -> Vec<ListingRef> {
        tracing::info!("Fetching listings: {}", page_url);

        let document = match self.fetcher.fetch(page_url).await {
            Ok(document) => document,
            Err(failure) => {
                tracing::warn!("Listing page unavailable: {}", failure);
                return Vec::new();
            }
        };

        let page = parse_listing(&document.body, &document.final_url, self.rules);

        if page.matched_rule.is_none() {
            tracing::warn!(
                page = %page_url,
                bytes = document.body.len(),
                "No card selector matched the listing page"
            );
            let excerpt: String = document.body.chars().take(EXCERPT_CHARS).collect();
            tracing::debug!(
                page = %page_url,
                excerpt = %excerpt,
                "Unmatched listing page content"
            );
        } else {
            tracing::info!(
                "Total unique events found on this page: {} ({} links rejected)",
                page.refs.len(),
                page.rejected
            );
        }

        page.refs
    }
}
