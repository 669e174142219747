//! # Gossip Store
//!
//! Bounded mapping from `msg_id` to the exact serialized envelope bytes
//! that were first seen for it, kept so `IWANT` requests can be answered
//! with byte-identical retransmissions. Ported from the reference's
//! `gossip_store_t[MAX_STORED_GOSSIP]` ring.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::MAX_STORED;

pub struct GossipStore {
    entries: DashMap<String, Vec<u8>>,
    by_sequence: DashMap<u64, String>,
    next_sequence: AtomicU64,
    capacity: usize,
}

impl GossipStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_STORED)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GossipStore {
            entries: DashMap::new(),
            by_sequence: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            capacity,
        }
    }

    /// Store the serialized form of `msg_id`, evicting the oldest entry if
    /// at capacity. Overwrites if already present without changing its
    /// recency — matches a ring buffer where you'd never re-store an id
    /// you've already deduplicated away.
    pub fn put(&self, msg_id: &str, serialized: Vec<u8>) {
        if self.entries.contains_key(msg_id) {
            self.entries.insert(msg_id.to_string(), serialized);
            return;
        }
        let seq = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(msg_id.to_string(), serialized);
        self.by_sequence.insert(seq, msg_id.to_string());

        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&self) {
        if let Some(oldest_seq) = self.by_sequence.iter().map(|e| *e.key()).min() {
            if let Some((_, id)) = self.by_sequence.remove(&oldest_seq) {
                self.entries.remove(&id);
            }
        }
    }

    pub fn get(&self, msg_id: &str) -> Option<Vec<u8>> {
        self.entries.get(msg_id).map(|v| v.clone())
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.entries.contains_key(msg_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for GossipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = GossipStore::new();
        store.put("m1", b"hello".to_vec());
        assert_eq!(store.get("m1"), Some(b"hello".to_vec()));
    }

    #[test]
    fn missing_id_returns_none() {
        let store = GossipStore::new();
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn eviction_drops_oldest_when_over_capacity() {
        let store = GossipStore::with_capacity(2);
        store.put("a", b"1".to_vec());
        store.put("b", b"2".to_vec());
        store.put("c", b"3".to_vec());
        assert_eq!(store.len(), 2);
        assert!(!store.contains("a"));
        assert!(store.contains("c"));
    }
}
