//! # Seen-Set
//!
//! Bounded deduplication cache of recently observed `msg_id`s. Ported from
//! the reference's `seen_ids[MAX_SEEN_MSGS][ID_LEN]` ring array indexed by
//! `seen_count % MAX_SEEN_MSGS`: once the ring is full, the oldest entry is
//! evicted to make room for the newest, same as overwriting that index.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::MAX_SEEN;

/// Ring-bounded set of message IDs, safe for concurrent insertion checks.
/// Held behind the node's `node_lock` alongside the gossip store so
/// "is this new?" and "mark it seen" stay atomic together.
pub struct SeenSet {
    ids: DashMap<String, u64>,
    by_sequence: DashMap<u64, String>,
    next_sequence: AtomicU64,
    capacity: usize,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SEEN)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SeenSet {
            ids: DashMap::new(),
            by_sequence: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.ids.contains_key(msg_id)
    }

    /// Insert `msg_id`, evicting the oldest entry if the ring is at
    /// capacity. No-op if already present.
    pub fn insert(&self, msg_id: &str) {
        if self.ids.contains_key(msg_id) {
            return;
        }
        let seq = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.ids.insert(msg_id.to_string(), seq);
        self.by_sequence.insert(seq, msg_id.to_string());

        if self.ids.len() > self.capacity {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&self) {
        if let Some(oldest_seq) = self.by_sequence.iter().map(|e| *e.key()).min() {
            if let Some((_, id)) = self.by_sequence.remove(&oldest_seq) {
                self.ids.remove(&id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The most recent `n` ids, newest first — used to build `IHAVE`
    /// advertisements.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let mut entries: Vec<(u64, String)> = self
            .by_sequence
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().take(n).map(|(_, id)| id).collect()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_reflects_inserts() {
        let seen = SeenSet::new();
        assert!(!seen.contains("a"));
        seen.insert("a");
        assert!(seen.contains("a"));
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let seen = SeenSet::new();
        seen.insert("a");
        seen.insert("a");
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn eviction_drops_oldest_when_over_capacity() {
        let seen = SeenSet::with_capacity(3);
        seen.insert("a");
        seen.insert("b");
        seen.insert("c");
        seen.insert("d");
        assert_eq!(seen.len(), 3);
        assert!(!seen.contains("a"));
        assert!(seen.contains("d"));
    }

    #[test]
    fn recent_returns_newest_first() {
        let seen = SeenSet::new();
        seen.insert("a");
        seen.insert("b");
        seen.insert("c");
        assert_eq!(seen.recent(2), vec!["c".to_string(), "b".to_string()]);
    }
}
