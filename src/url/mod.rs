//! URL handling module for the harvester
//!
//! This module provides canonical address normalization, relative link
//! resolution, event-link recognition and listing page address construction.

mod matcher;
mod normalize;

pub use matcher::is_item_link;
pub use normalize::resolve_url;

/// Builds the address of listing page `page` for a base query
///
/// The page parameter is joined with `&` when the base already carries a
/// query string and with `?` otherwise.
///
/// # Examples
///
/// ```
/// use event_harvester::url::page_url;
///
/// assert_eq!(
///     page_url("https://example.com/d/online/all-events/", 2),
///     "https://example.com/d/online/all-events/?page=2"
/// );
/// assert_eq!(
///     page_url("https://example.com/search?q=jazz", 3),
///     "https://example.com/search?q=jazz&page=3"
/// );
/// ```
pub fn page_url(base: &str, page: u32) -> String {
    if base.ends_with('?') || base.ends_with('&') {
        format!("{}page={}", base, page)
    } else if base.contains('?') {
        format!("{}&page={}", base, page)
    } else {
        format!("{}?page={}", base, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_without_query() {
        assert_eq!(
            page_url("https://example.com/events", 1),
            "https://example.com/events?page=1"
        );
    }

    #[test]
    fn test_page_url_with_query() {
        assert_eq!(
            page_url("https://example.com/events?city=sf", 4),
            "https://example.com/events?city=sf&page=4"
        );
    }

    #[test]
    fn test_page_url_with_dangling_separator() {
        assert_eq!(
            page_url("https://example.com/events?", 2),
            "https://example.com/events?page=2"
        );
        assert_eq!(
            page_url("https://example.com/events?city=sf&", 2),
            "https://example.com/events?city=sf&page=2"
        );
    }
}
