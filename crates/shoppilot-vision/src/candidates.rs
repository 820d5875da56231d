//! Accepted candidate tracking.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// How many candidate URLs are kept; older ones are evicted first.
pub const MAX_CANDIDATES: usize = 3;

/// Bounded FIFO of product page URLs the classifier accepted during the
/// current conversation.
#[derive(Debug, Default)]
pub struct CandidateList {
    urls: Mutex<VecDeque<String>>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a URL, evicting the oldest entry once full.
    pub fn push(&self, url: impl Into<String>) {
        let mut urls = self.urls.lock();
        if urls.len() == MAX_CANDIDATES {
            urls.pop_front();
        }
        urls.push_back(url.into());
    }

    /// Current candidates, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.urls.lock().iter().cloned().collect()
    }

    /// Drop everything; called when a new search begins.
    pub fn clear(&self) {
        self.urls.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.urls.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_snapshot_preserve_order() {
        let list = CandidateList::new();
        list.push("https://example.com/a");
        list.push("https://example.com/b");
        assert_eq!(
            list.snapshot(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let list = CandidateList::new();
        for url in ["a", "b", "c", "d"] {
            list.push(url);
        }
        assert_eq!(list.snapshot(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_clear() {
        let list = CandidateList::new();
        list.push("a");
        list.clear();
        assert!(list.is_empty());
    }
}
