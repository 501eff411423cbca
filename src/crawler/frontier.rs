//! Breadth-first crawl frontier
//!
//! A FIFO queue of `(url, depth)` entries plus the set of URLs seen during
//! this run. The seen set is in-memory only; cross-run deduplication is the
//! ledger's job.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Canonical URL
    pub url: Url,
    /// Depth of first discovery (the seed is 0)
    pub depth: u32,
}

/// FIFO queue with per-run duplicate suppression
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueueEntry>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a URL unless it was already seen this run
    ///
    /// # Returns
    ///
    /// `true` if the URL was enqueued
    pub fn push(&mut self, url: Url, depth: u32) -> bool {
        if !self.mark_seen(&url) {
            return false;
        }
        self.queue.push_back(QueueEntry { url, depth });
        true
    }

    /// Records a URL as seen without enqueueing it
    ///
    /// # Returns
    ///
    /// `true` if the URL had not been seen before
    pub fn mark_seen(&mut self, url: &Url) -> bool {
        self.seen.insert(url.as_str().to_string())
    }

    pub fn is_seen(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    /// Removes the oldest entry
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(url("https://example.com/"), 0);
        frontier.push(url("https://example.com/a"), 1);
        frontier.push(url("https://example.com/b"), 1);

        let order: Vec<String> = std::iter::from_fn(|| frontier.pop())
            .map(|entry| entry.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/", "/a", "/b"]);
    }

    #[test]
    fn test_duplicates_suppressed() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(url("https://example.com/a"), 1));
        assert!(!frontier.push(url("https://example.com/a"), 2));
        assert_eq!(frontier.len(), 1);

        // Popping does not forget the URL
        let entry = frontier.pop().unwrap();
        assert_eq!(entry.depth, 1);
        assert!(!frontier.push(url("https://example.com/a"), 1));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_mark_seen_without_enqueue() {
        let mut frontier = Frontier::new();
        assert!(frontier.mark_seen(&url("https://example.com/deep")));
        assert!(frontier.is_seen(&url("https://example.com/deep")));
        assert!(!frontier.push(url("https://example.com/deep"), 4));
        assert_eq!(frontier.seen_count(), 1);
        assert!(frontier.is_empty());
    }
}
