//! The fixed-width command frame and its codec.

use bytes::{Buf, BufMut};

use crate::{
    command::Command,
    errors::{ProtocolError, Result},
    text::TextField,
};

/// Width of each name field (usernames and server address)
pub const NAME_SIZE: usize = 32;

/// Width of the command-specific argument field
pub const ARGUMENTS_SIZE: usize = 256;

/// Width of the authentication tag
pub const SIGNATURE_SIZE: usize = 32;

/// A username or server address as carried on the wire
pub type Name = TextField<NAME_SIZE>;

/// One authenticated command.
///
/// The struct holds decoded values; byte order only exists at the codec
/// boundary ([`Frame::decode`] / [`Frame::encode`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command code selecting the handler
    pub command: u8,
    /// Initiating (local) account
    pub x_username: Name,
    /// Counterparty account
    pub y_username: Name,
    /// Counterparty's host
    pub y_server_address: Name,
    /// Command-specific payload
    pub arguments: [u8; ARGUMENTS_SIZE],
    /// Per-peer sequence number
    pub counter: u32,
    /// SHA-256 tag over the signed region plus the shared secret
    pub signature: [u8; SIGNATURE_SIZE],
}

// The signature must be the trailing field for the signed-region split to hold.
const _: () = assert!(Frame::SIGNED_LEN + SIGNATURE_SIZE == Frame::SIZE);

impl Frame {
    /// Total encoded size
    pub const SIZE: usize = 1 + 3 * NAME_SIZE + ARGUMENTS_SIZE + 4 + SIGNATURE_SIZE;

    /// Length of the prefix covered by the signature (everything but the tag)
    pub const SIGNED_LEN: usize = Self::SIZE - SIGNATURE_SIZE;

    /// Create an empty frame for `command`. Names, arguments, counter and
    /// signature are zeroed.
    pub fn new(command: impl Into<u8>) -> Self {
        Self {
            command: command.into(),
            x_username: Name::default(),
            y_username: Name::default(),
            y_server_address: Name::default(),
            arguments: [0u8; ARGUMENTS_SIZE],
            counter: 0,
            signature: [0u8; SIGNATURE_SIZE],
        }
    }

    /// The command code as a known [`Command`], if it is one.
    pub fn command(&self) -> Option<Command> {
        Command::from_u8(self.command)
    }

    /// Decode a frame from exactly [`Frame::SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(ProtocolError::MalformedFrame { expected: Self::SIZE, actual: bytes.len() });
        }

        let mut buf = bytes;
        let command = buf.get_u8();
        let x_username = Name::from_bytes(take_array(&mut buf));
        let y_username = Name::from_bytes(take_array(&mut buf));
        let y_server_address = Name::from_bytes(take_array(&mut buf));
        let arguments = take_array(&mut buf);
        let counter = buf.get_u32();
        let signature = take_array(&mut buf);
        debug_assert!(!buf.has_remaining());

        Ok(Self { command, x_username, y_username, y_server_address, arguments, counter, signature })
    }

    /// Append the encoded frame to `dst`.
    ///
    /// `dst` must have room for [`Frame::SIZE`] bytes; growable buffers such
    /// as `BytesMut` and `Vec<u8>` always do.
    pub fn encode(&self, dst: &mut impl BufMut) {
        self.encode_signed_region(dst);
        dst.put_slice(&self.signature);
    }

    /// Encode into a fixed array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        self.encode(&mut &mut out[..]);
        out
    }

    /// The bytes covered by the signature.
    pub fn signed_region(&self) -> [u8; Self::SIGNED_LEN] {
        let mut out = [0u8; Self::SIGNED_LEN];
        self.encode_signed_region(&mut &mut out[..]);
        out
    }

    fn encode_signed_region(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.command);
        dst.put_slice(self.x_username.as_bytes());
        dst.put_slice(self.y_username.as_bytes());
        dst.put_slice(self.y_server_address.as_bytes());
        dst.put_slice(&self.arguments);
        dst.put_u32(self.counter);
    }

    /// Read a big-endian `i32` from the first four argument bytes.
    pub fn argument_i32(&self) -> i32 {
        let mut head = &self.arguments[..4];
        head.get_i32()
    }

    /// Write a big-endian `i32` into the first four argument bytes.
    pub fn set_argument_i32(&mut self, value: i32) {
        let mut head = &mut self.arguments[..4];
        head.put_i32(value);
    }
}

fn take_array<const N: usize>(buf: &mut impl Buf) -> [u8; N] {
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    out
}
