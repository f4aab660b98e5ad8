//! Per-crawl identity tracking
//!
//! Scoped to one paginated crawl; duplicates across runs are the store's
//! concern, not this set's.

use std::collections::HashSet;
use url::Url;

/// Canonical addresses already handed to the detail scanner
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the address has been marked seen
    pub fn is_new(&self, address: &Url) -> bool {
        !self.seen.contains(address.as_str())
    }

    pub fn mark_seen(&mut self, address: &Url) {
        self.seen.insert(address.as_str().to_string());
    }

    /// Marks the address seen, returning whether it was new
    pub fn insert(&mut self, address: &Url) -> bool {
        self.seen.insert(address.as_str().to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_new_until_marked() {
        let mut dedup = Deduplicator::new();
        let address = url("https://x.io/e/1");

        assert!(dedup.is_new(&address));
        assert!(dedup.is_new(&address));

        dedup.mark_seen(&address);
        assert!(!dedup.is_new(&address));
        assert!(!dedup.is_new(&address));
    }

    #[test]
    fn test_insert_true_exactly_once() {
        let mut dedup = Deduplicator::new();
        let address = url("https://x.io/e/1");

        assert!(dedup.insert(&address));
        assert!(!dedup.insert(&address));
        assert!(dedup.insert(&url("https://x.io/e/2")));
        assert_eq!(dedup.len(), 2);
    }
}
