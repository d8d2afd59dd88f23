//! Fixed-width NUL-padded text fields.
//!
//! Usernames and server addresses travel as 32-byte arrays. The codec keeps
//! them as raw bytes: nothing on the wire guarantees a terminating NUL, so
//! interpreting a field as text is a separate, checked step.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// A fixed-width text field of `N` bytes, padded with trailing NULs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextField<const N: usize>([u8; N]);

impl<const N: usize> TextField<N> {
    /// Field width in bytes
    pub const CAPACITY: usize = N;

    /// Wrap raw field bytes exactly as they appeared on the wire.
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build a field from text, NUL-padding it to `N` bytes.
    ///
    /// Text that fills the field completely is allowed (no terminator needed).
    pub fn new(text: &str) -> Result<Self> {
        let raw = text.as_bytes();
        if raw.len() > N {
            return Err(ProtocolError::TextTooLong { len: raw.len(), capacity: N });
        }
        if raw.contains(&0) {
            return Err(ProtocolError::InvalidText);
        }

        let mut bytes = [0u8; N];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    /// Raw field bytes, including padding.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Bytes before the first NUL (or the whole field if there is none).
    fn content(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// Interpret the field as text.
    ///
    /// Fails if the content is not UTF-8 or if any non-NUL byte follows the
    /// padding, since such a field has two plausible readings.
    pub fn to_str(&self) -> Result<&str> {
        let content = self.content();
        if self.0[content.len()..].iter().any(|&b| b != 0) {
            return Err(ProtocolError::InvalidText);
        }
        std::str::from_utf8(content).map_err(|_| ProtocolError::InvalidText)
    }

    /// Interpret the field as an identifier that is safe to use as a single
    /// path component.
    pub fn to_identifier(&self) -> Result<&str> {
        let text = self.to_str()?;
        let invalid = |reason| ProtocolError::InvalidIdentifier { value: text.to_string(), reason };

        if text.is_empty() {
            return Err(invalid("empty"));
        }
        if text == "." || text == ".." {
            return Err(invalid("relative path component"));
        }
        if text.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(invalid("contains a separator or control character"));
        }
        Ok(text)
    }
}

impl<const N: usize> Default for TextField<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for TextField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextField").field(&String::from_utf8_lossy(self.content())).finish()
    }
}
