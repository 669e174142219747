//! # Membership View
//!
//! A bounded, randomly-sampleable set of known peers. Ported from the
//! reference implementation's `membership_t` (a fixed array plus a mutex):
//! `touch_or_add` mirrors `membership_add`'s refresh-or-insert-or-reject
//! semantics, and `sample` mirrors `membership_get_random`'s Fisher-Yates
//! shuffle-then-walk.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::MAX_PEERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRecord {
    pub addr: SocketAddr,
    pub last_seen_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchResult {
    Added,
    Refreshed,
    RejectedFull,
}

struct Inner {
    peers: Vec<PeerRecord>,
    limit: usize,
    rng: StdRng,
}

/// The membership view. Cheap to clone (it's an `Arc` internally via the
/// `RwLock`'s ownership) — share one instance across the node's duties.
pub struct MembershipView {
    inner: RwLock<Inner>,
}

impl MembershipView {
    pub fn new(limit: usize, seed: u64) -> Self {
        MembershipView {
            inner: RwLock::new(Inner {
                peers: Vec::new(),
                limit: limit.min(MAX_PEERS),
                rng: StdRng::seed_from_u64(seed),
            }),
        }
    }

    /// Insert a newly contacted peer, or refresh its liveness timestamp if
    /// already known. Rejects the insert (does not evict) when the view is
    /// already at capacity, matching the reference's reject-on-full policy.
    pub fn touch_or_add(&self, addr: SocketAddr) -> TouchResult {
        let now = now_ms();
        let mut inner = self.inner.write();
        if let Some(existing) = inner.peers.iter_mut().find(|p| p.addr == addr) {
            existing.last_seen_ms = now;
            return TouchResult::Refreshed;
        }
        if inner.peers.len() >= inner.limit {
            return TouchResult::RejectedFull;
        }
        inner.peers.push(PeerRecord {
            addr,
            last_seen_ms: now,
        });
        TouchResult::Added
    }

    /// Uniformly sample up to `k` distinct peers, excluding `exclude` if
    /// given. Returns fewer than `k` when the view doesn't hold that many.
    pub fn sample(&self, k: usize, exclude: Option<SocketAddr>) -> Vec<SocketAddr> {
        let mut inner = self.inner.write();
        let candidates: Vec<SocketAddr> = inner
            .peers
            .iter()
            .map(|p| p.addr)
            .filter(|a| Some(*a) != exclude)
            .collect();

        let mut indices: Vec<usize> = (0..candidates.len()).collect();
        // Fisher-Yates shuffle, mirroring membership_get_random's loop.
        for i in (1..indices.len()).rev() {
            let j = inner.rng.gen_range(0..=i);
            indices.swap(i, j);
        }

        indices
            .into_iter()
            .take(k)
            .map(|i| candidates[i])
            .collect()
    }

    /// Remove every peer not heard from within `timeout_ms`.
    pub fn expire(&self, timeout_ms: u64) -> Vec<SocketAddr> {
        let now = now_ms();
        let mut inner = self.inner.write();
        let mut expired = Vec::new();
        let mut i = 0;
        while i < inner.peers.len() {
            if now.saturating_sub(inner.peers[i].last_seen_ms) > timeout_ms {
                expired.push(inner.peers[i].addr);
                inner.peers.swap_remove(i);
            } else {
                i += 1;
            }
        }
        expired
    }

    pub fn count(&self) -> usize {
        self.inner.read().peers.len()
    }

    pub fn snapshot(&self) -> Vec<SocketAddr> {
        self.inner.read().peers.iter().map(|p| p.addr).collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
