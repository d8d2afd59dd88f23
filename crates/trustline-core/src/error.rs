//! Ledger and router error types.

use thiserror::Error;
use trustline_proto::ProtocolError;

use crate::{peer::PeerKey, storage::StorageError};

/// Why a frame was not applied.
///
/// The variants carry enough detail for local diagnostics. None of it may
/// reach the wire: a driver treats every [`is_security_rejection`] error
/// identically to "never received".
///
/// [`is_security_rejection`]: LedgerError::is_security_rejection
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No handler registered for the command code
    #[error("unknown command {0:#04x}")]
    UnknownCommand(u8),

    /// Wrong length or an unparseable field
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] ProtocolError),

    /// No registered relationship for the addressed peer triple
    #[error("unknown peer {0}")]
    UnknownPeer(PeerKey),

    /// Authentication tag does not match the shared secret
    #[error("signature mismatch for {0}")]
    SignatureMismatch(PeerKey),

    /// Counter not strictly greater than the last accepted one
    #[error("stale counter {counter} for {peer}, last accepted {last_counter}")]
    ReplayedOrStaleCounter {
        /// Addressed peer
        peer: PeerKey,
        /// Counter carried by the frame
        counter: u32,
        /// Counter already on record
        last_counter: u32,
    },

    /// Authenticated frame whose command argument is unusable
    #[error("malformed argument for {peer}: {reason}")]
    MalformedArgument {
        /// Addressed peer
        peer: PeerKey,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Ledger or chain artifacts could not be read or written
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl LedgerError {
    /// Whether this is a deliberate, silent rejection of peer input as
    /// opposed to a local failure worth surfacing in diagnostics.
    pub fn is_security_rejection(&self) -> bool {
        !matches!(self, Self::StorageFailure(_))
    }
}

/// Router configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A handler is already registered for this code
    #[error("handler already registered for command {0:#04x}")]
    AlreadyRegistered(u8),
}
