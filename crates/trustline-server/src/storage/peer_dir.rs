//! Per-peer directory store.
//!
//! ```text
//! <root>/accounts/<x_username>/peers/<y_server_address>/<y_username>/
//!     secret_key   32 raw bytes
//!     counter      big-endian u32, absent until the first accepted frame
//!     trustline    big-endian i32, absent until first set
//!     journal      present only while a commit is in flight
//! ```
//!
//! # Commit protocol
//!
//! The counter and trust line are separate artifacts but must change
//! together. A commit first makes the new pair durable in `journal` (temp
//! file + fsync + rename), then rewrites each artifact the same way, then
//! removes the journal. The commit point is the journal landing: once it is
//! durable the commit succeeds even if rewriting the artifacts fails, and
//! any reader that finds a journal rolls it forward before trusting the
//! artifacts. A crash or I/O error at any point therefore leaves either the
//! old pair or the new pair visible, never half of each.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use trustline_core::{
    PeerKey, PeerRecord, PeerStore, SharedSecret, StorageError, peer::SECRET_SIZE,
};

use super::{read_optional, sync_dir, write_atomic};

const ACCOUNTS_DIR: &str = "accounts";
const PEERS_DIR: &str = "peers";
const SECRET_FILE: &str = "secret_key";
const COUNTER_FILE: &str = "counter";
const TRUSTLINE_FILE: &str = "trustline";
const JOURNAL_FILE: &str = "journal";

/// Peer store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`. Nothing is touched on disk until used.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one relationship's artifacts.
    pub fn peer_dir(&self, peer: &PeerKey) -> PathBuf {
        self.root
            .join(ACCOUNTS_DIR)
            .join(peer.x_username())
            .join(PEERS_DIR)
            .join(peer.y_server_address())
            .join(peer.y_username())
    }

    /// Finish an interrupted commit, if there is one.
    ///
    /// Returns the journalled record when a roll-forward happened.
    fn recover(&self, dir: &Path) -> Result<Option<PeerRecord>, StorageError> {
        let journal = dir.join(JOURNAL_FILE);
        let Some(bytes) = read_optional(&journal)? else {
            return Ok(None);
        };

        let record = decode_journal(&bytes).ok_or_else(|| StorageError::Corrupt {
            artifact: journal.display().to_string(),
            reason: format!("expected 4 or 8 bytes, found {}", bytes.len()),
        })?;

        tracing::warn!(
            dir = %dir.display(),
            counter = record.last_counter,
            "rolling forward interrupted ledger commit"
        );
        self.apply(dir, record)?;
        Ok(Some(record))
    }

    /// Write both artifacts and retire the journal.
    fn apply(&self, dir: &Path, record: PeerRecord) -> Result<(), StorageError> {
        if let Some(trustline) = record.trustline {
            write_atomic(&dir.join(TRUSTLINE_FILE), &trustline.to_be_bytes())?;
        }
        write_atomic(&dir.join(COUNTER_FILE), &record.last_counter.to_be_bytes())?;

        let journal = dir.join(JOURNAL_FILE);
        fs::remove_file(&journal).map_err(|e| StorageError::io(&journal, e))?;
        sync_dir(dir)
    }
}

impl PeerStore for FsStore {
    fn load_secret(&self, peer: &PeerKey) -> Result<Option<SharedSecret>, StorageError> {
        let path = self.peer_dir(peer).join(SECRET_FILE);
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };

        SharedSecret::from_slice(&bytes).map(Some).ok_or_else(|| StorageError::Corrupt {
            artifact: path.display().to_string(),
            reason: format!("expected {SECRET_SIZE} bytes, found {}", bytes.len()),
        })
    }

    fn load_record(&self, peer: &PeerKey) -> Result<PeerRecord, StorageError> {
        let dir = self.peer_dir(peer);
        if let Some(record) = self.recover(&dir)? {
            return Ok(record);
        }

        let last_counter = read_be(&dir.join(COUNTER_FILE))?.map_or(0, u32::from_be_bytes);
        let trustline = read_be(&dir.join(TRUSTLINE_FILE))?.map(i32::from_be_bytes);
        Ok(PeerRecord { last_counter, trustline })
    }

    fn commit(&self, peer: &PeerKey, record: PeerRecord) -> Result<(), StorageError> {
        let dir = self.peer_dir(peer);
        write_atomic(&dir.join(JOURNAL_FILE), &encode_journal(record))?;
        sync_dir(&dir)?;

        // The journal is durable, so the commit has happened. Artifacts that
        // fail to update are rewritten from it on the next load.
        if let Err(error) = self.apply(&dir, record) {
            tracing::warn!(
                %peer,
                %error,
                counter = record.last_counter,
                "commit journalled but not applied; deferring to roll-forward"
            );
        }
        Ok(())
    }

    fn register_peer(&self, peer: &PeerKey, secret: &SharedSecret) -> Result<(), StorageError> {
        let dir = self.peer_dir(peer);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let path = dir.join(SECRET_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyRegistered(peer.clone()));
            },
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        file.write_all(secret.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| StorageError::io(&path, e))?;

        tracing::info!(%peer, dir = %dir.display(), "registered peer relationship");
        sync_dir(&dir)
    }
}

/// Read a 4-byte big-endian artifact; absent reads as `None`.
fn read_be(path: &Path) -> Result<Option<[u8; 4]>, StorageError> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    <[u8; 4]>::try_from(bytes.as_slice()).map(Some).map_err(|_| StorageError::Corrupt {
        artifact: path.display().to_string(),
        reason: format!("expected 4 bytes, found {}", bytes.len()),
    })
}

/// Counter first, then the value when there is one.
fn encode_journal(record: PeerRecord) -> Vec<u8> {
    let mut bytes = record.last_counter.to_be_bytes().to_vec();
    if let Some(trustline) = record.trustline {
        bytes.extend_from_slice(&trustline.to_be_bytes());
    }
    bytes
}

fn decode_journal(bytes: &[u8]) -> Option<PeerRecord> {
    let (counter, rest) = bytes.split_first_chunk::<4>()?;
    let trustline = match rest.len() {
        0 => None,
        4 => Some(i32::from_be_bytes(rest.try_into().ok()?)),
        _ => return None,
    };
    Some(PeerRecord { last_counter: u32::from_be_bytes(*counter), trustline })
}
