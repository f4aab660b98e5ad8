use url::Url;

/// Checks whether a resolved link points at an individual event page
///
/// Listing pages are full of navigation chrome (category links, pagination,
/// footers). Genuine event links carry a structural marker in their path
/// (`/e/` on Eventbrite-style directories) and are never trivially short.
///
/// # Examples
///
/// ```
/// use event_harvester::url::is_item_link;
/// use url::Url;
///
/// let event = Url::parse("https://example.com/e/jazz-night-123").unwrap();
/// let nav = Url::parse("https://example.com/d/online/").unwrap();
/// assert!(is_item_link(&event, "/e/", 21));
/// assert!(!is_item_link(&nav, "/e/", 21));
/// ```
pub fn is_item_link(url: &Url, marker: &str, min_length: usize) -> bool {
    let link = url.as_str();
    link.contains(marker) && link.len() >= min_length
}
