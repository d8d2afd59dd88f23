//! Wire format for trust-line command frames.
//!
//! Every command exchanged between two peers is a single fixed-width
//! 389-byte frame carried in one datagram. There is no header/payload split
//! and no length prefix: the datagram length *is* the framing, so a payload
//! of any other size is rejected before a single field is looked at.
//!
//! ```text
//! offset  size  field
//!      0     1  command
//!      1    32  x_username         (NUL-padded text)
//!     33    32  y_username         (NUL-padded text)
//!     65    32  y_server_address   (NUL-padded text)
//!     97   256  arguments          (command-specific)
//!    353     4  counter            (big-endian u32)
//!    357    32  signature          (SHA-256 tag over bytes 0..357 + secret)
//! ```
//!
//! # Security
//!
//! Fields are read and written one at a time with an explicit byte order; a
//! buffer is never reinterpreted as a native struct. Text fields are kept as
//! raw fixed-width bytes until a caller asks for them as text, at which point
//! they are bounds-checked and validated.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod errors;
pub mod frame;
pub mod text;

pub use command::Command;
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use text::TextField;
