//! Command codes carried in the first byte of every frame.

/// Known command codes.
///
/// The wire carries a raw `u8` so that frames with codes this build does not
/// know still decode; routing decides what to do with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Set the trust line extended to the counterparty
    SetTrustline = 0x00,
    /// Read back the current trust line (authenticated, counter-checked)
    GetTrustline = 0x04,
}

impl Command {
    /// Convert to the wire code
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from a wire code, returning `None` for unknown codes
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::SetTrustline),
            0x04 => Some(Self::GetTrustline),
            _ => None,
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.to_u8()
    }
}
