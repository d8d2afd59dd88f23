//! Peer relationship identity and per-peer state.

use std::fmt;

use trustline_proto::{Frame, ProtocolError, TextField, frame::NAME_SIZE};

/// Size of the shared secret in bytes
pub const SECRET_SIZE: usize = 32;

/// The triple that scopes a ledger record and its shared secret:
/// local account, counterparty host, counterparty account.
///
/// Every component has been validated as a single safe path component, so a
/// store may use them directly to build locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerKey {
    x_username: String,
    y_server_address: String,
    y_username: String,
}

impl PeerKey {
    /// Build a key from its three components, validating each.
    pub fn new(
        x_username: &str,
        y_server_address: &str,
        y_username: &str,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            x_username: identifier(x_username)?,
            y_server_address: identifier(y_server_address)?,
            y_username: identifier(y_username)?,
        })
    }

    /// Extract the key addressed by a frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        Ok(Self {
            x_username: frame.x_username.to_identifier()?.to_string(),
            y_server_address: frame.y_server_address.to_identifier()?.to_string(),
            y_username: frame.y_username.to_identifier()?.to_string(),
        })
    }

    /// Local account
    pub fn x_username(&self) -> &str {
        &self.x_username
    }

    /// Counterparty host
    pub fn y_server_address(&self) -> &str {
        &self.y_server_address
    }

    /// Counterparty account
    pub fn y_username(&self) -> &str {
        &self.y_username
    }

    /// Write this key's names into a frame.
    pub fn address(&self, frame: &mut Frame) -> Result<(), ProtocolError> {
        frame.x_username = TextField::new(&self.x_username)?;
        frame.y_server_address = TextField::new(&self.y_server_address)?;
        frame.y_username = TextField::new(&self.y_username)?;
        Ok(())
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}@{}", self.x_username, self.y_username, self.y_server_address)
    }
}

fn identifier(text: &str) -> Result<String, ProtocolError> {
    TextField::<NAME_SIZE>::new(text)?.to_identifier().map(str::to_string)
}

/// The 32-byte secret shared out of band by both ends of a relationship.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; SECRET_SIZE]);

impl SharedSecret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Wrap a slice, returning `None` unless it is exactly [`SECRET_SIZE`]
    /// bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Durable per-peer ledger state.
///
/// `last_counter` and `trustline` only ever change together, in a single
/// store commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerRecord {
    /// Highest counter accepted so far (0 if none)
    pub last_counter: u32,
    /// Current trust-line value, `None` until first set
    pub trustline: Option<i32>,
}

#[cfg(test)]
mod tests {
    use trustline_proto::Command;

    use super::*;

    #[test]
    fn key_roundtrips_through_frame() {
        let key = PeerKey::new("alice", "ripple.example.org", "bob").unwrap();
        let mut frame = Frame::new(Command::SetTrustline);
        key.address(&mut frame).unwrap();

        assert_eq!(PeerKey::from_frame(&frame).unwrap(), key);
    }

    #[test]
    fn key_rejects_traversal() {
        assert!(PeerKey::new("alice", "..", "bob").is_err());
        assert!(PeerKey::new("alice", "host", "bob/../../etc").is_err());
    }

    #[test]
    fn unaddressed_frame_has_no_key() {
        let frame = Frame::new(Command::SetTrustline);
        assert!(PeerKey::from_frame(&frame).is_err());
    }

    #[test]
    fn secret_requires_exact_length() {
        assert!(SharedSecret::from_slice(&[0u8; 31]).is_none());
        assert!(SharedSecret::from_slice(&[0u8; 33]).is_none());
        assert!(SharedSecret::from_slice(&[7u8; 32]).is_some());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SharedSecret::from_bytes([0x42; 32]);
        assert_eq!(format!("{secret:?}"), "SharedSecret(<redacted>)");
    }

    #[test]
    fn display_names_both_parties() {
        let key = PeerKey::new("alice", "host", "bob").unwrap();
        assert_eq!(key.to_string(), "alice -> bob@host");
    }
}
