//! Peer store abstraction.
//!
//! A peer store owns the durable per-relationship artifacts: the shared
//! secret and the `(last_counter, trustline)` pair. The pair is always
//! written in one [`PeerStore::commit`] call; an implementation must make
//! that call all-or-nothing across crashes.

use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use thiserror::Error;

use crate::peer::{PeerKey, PeerRecord, SharedSecret};

/// Storage layer errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Artifact being accessed
        path: PathBuf,
        /// OS error
        source: io::Error,
    },

    /// Artifact exists but does not have its canonical form
    #[error("corrupt artifact {artifact}: {reason}")]
    Corrupt {
        /// Artifact description
        artifact: String,
        /// What was wrong with it
        reason: String,
    },

    /// Refusing to overwrite an existing relationship
    #[error("peer relationship {0} is already registered")]
    AlreadyRegistered(PeerKey),

    /// Store refused the operation (in-memory fault injection)
    #[error("store unavailable")]
    Unavailable,
}

impl StorageError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Durable per-peer ledger state.
pub trait PeerStore: Send + Sync {
    /// Load the shared secret for a relationship.
    ///
    /// `Ok(None)` means the relationship does not exist.
    fn load_secret(&self, peer: &PeerKey) -> Result<Option<SharedSecret>, StorageError>;

    /// Load the counter/value pair. Missing state reads as
    /// [`PeerRecord::default`] (counter 0, no value).
    fn load_record(&self, peer: &PeerKey) -> Result<PeerRecord, StorageError>;

    /// Durably replace the counter/value pair, atomically.
    fn commit(&self, peer: &PeerKey, record: PeerRecord) -> Result<(), StorageError>;

    /// Create a relationship with its shared secret.
    fn register_peer(&self, peer: &PeerKey, secret: &SharedSecret) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
struct MemoryPeer {
    secret: SharedSecret,
    record: PeerRecord,
}

/// In-memory peer store for tests and simulation.
///
/// Commits can be made to fail on demand to exercise storage-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    peers: Mutex<HashMap<PeerKey, MemoryPeer>>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail (or succeed again).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Current record for a peer, if the relationship exists.
    pub fn record(&self, peer: &PeerKey) -> Option<PeerRecord> {
        self.peers.lock().get(peer).map(|p| p.record)
    }
}

impl PeerStore for MemoryStore {
    fn load_secret(&self, peer: &PeerKey) -> Result<Option<SharedSecret>, StorageError> {
        Ok(self.peers.lock().get(peer).map(|p| p.secret.clone()))
    }

    fn load_record(&self, peer: &PeerKey) -> Result<PeerRecord, StorageError> {
        Ok(self.record(peer).unwrap_or_default())
    }

    fn commit(&self, peer: &PeerKey, record: PeerRecord) -> Result<(), StorageError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        match self.peers.lock().get_mut(peer) {
            Some(entry) => {
                entry.record = record;
                Ok(())
            },
            None => Err(StorageError::Corrupt {
                artifact: peer.to_string(),
                reason: "commit for unregistered peer".to_string(),
            }),
        }
    }

    fn register_peer(&self, peer: &PeerKey, secret: &SharedSecret) -> Result<(), StorageError> {
        let mut peers = self.peers.lock();
        if peers.contains_key(peer) {
            return Err(StorageError::AlreadyRegistered(peer.clone()));
        }
        peers.insert(peer.clone(), MemoryPeer { secret: secret.clone(), record: PeerRecord::default() });
        Ok(())
    }
}
