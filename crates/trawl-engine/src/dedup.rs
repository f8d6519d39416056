use std::collections::HashSet;
use trawl_common::model::Record;

/// Session-scoped set of content fingerprints.
///
/// Owned by a single scrape worker; it never shrinks during a session.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the fingerprint and returns true the first time this content is seen.
    pub fn is_new(&mut self, record: &Record) -> bool {
        self.seen.insert(record.fingerprint())
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

    fn record(text: &str, selector: &str) -> Record {
        Record::from_text(text, vec![], selector).unwrap()
    }

    #[test]
    fn test_repeat_content_is_rejected() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.is_new(&record("Title A\nPrice 1", "item")));
        assert!(!dedup.is_new(&record("Title A\nPrice 1", "item")));
        assert!(dedup.is_new(&record("Title B\nPrice 2", "item")));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_same_content_from_other_selector_is_rejected() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.is_new(&record("Shared", "item")));
        assert!(!dedup.is_new(&record("Shared", "card")));
    }

    #[test]
    fn test_fresh_deduplicator_accepts_everything() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.is_empty());
        assert!(dedup.is_new(&record("Once", "item")));
        assert!(!dedup.is_empty());
    }
}
