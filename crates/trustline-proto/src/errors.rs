//! Error types for frame encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Everything that can go wrong turning bytes into a [`crate::Frame`] or a
/// frame field into something meaningful.
///
/// All of these are "malformed frame" conditions from the peer's point of
/// view. Callers on the receive path must not echo them back over the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Datagram length does not match the fixed frame size
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Required frame size
        expected: usize,
        /// Size actually received
        actual: usize,
    },

    /// Text is longer than the fixed-width field that must hold it
    #[error("text of {len} bytes does not fit in a {capacity}-byte field")]
    TextTooLong {
        /// Length of the rejected text
        len: usize,
        /// Field capacity
        capacity: usize,
    },

    /// Field bytes are not valid NUL-padded UTF-8
    #[error("field is not valid NUL-padded UTF-8")]
    InvalidText,

    /// Field is valid text but unusable as a peer identifier
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Offending text
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },
}
