//! Server error types.

use std::io;

use thiserror::Error;
use trustline_core::{RouterError, StorageError};
use trustline_proto::ProtocolError;

/// Errors that stop the node or a command-line operation.
///
/// Per-frame failures never surface here; the driver logs them and keeps
/// serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket or filesystem I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Ledger storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Handler registration failed
    #[error(transparent)]
    Router(#[from] RouterError),

    /// A name given on the command line is not a valid identifier
    #[error("invalid peer: {0}")]
    InvalidPeer(#[from] ProtocolError),

    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),
}
