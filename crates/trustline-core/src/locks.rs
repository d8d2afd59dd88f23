//! Per-peer single-writer locks.
//!
//! Two frames for the same relationship must not interleave their
//! read-verify-write of the counter, or both could pass the freshness check
//! against the same `last_counter`. Frames for different relationships do
//! not contend.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};

use crate::peer::PeerKey;

/// Held for the duration of one peer's read-modify-write.
pub type PeerGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of one mutex per peer relationship.
///
/// Entries are created on first use and kept for the life of the registry;
/// callers only lock peers that resolved to a registered relationship, so
/// the map is bounded by the number of relationships.
#[derive(Debug, Default)]
pub struct PeerLocks {
    locks: Mutex<HashMap<PeerKey, Arc<Mutex<()>>>>,
}

impl PeerLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this peer's lock is held.
    pub fn lock(&self, peer: &PeerKey) -> PeerGuard {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(peer.clone()).or_default())
        };
        // Registry lock is released before waiting on the peer lock
        lock.lock_arc()
    }

    /// Number of peers that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no peer has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
