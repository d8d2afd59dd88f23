//! Command dispatch.
//!
//! A fixed 256-entry table maps the frame's command byte to a handler. The
//! table is filled once at startup and shared read-only afterwards (wrap the
//! router in an `Arc` once registration is done).
//!
//! Frames with an unregistered code are rejected with
//! [`LedgerError::UnknownCommand`], which drivers treat like any other
//! security rejection: no response at all, so the router cannot be used to
//! probe which commands exist.

use std::fmt;

use trustline_proto::Frame;

use crate::error::{LedgerError, RouterError};

/// Actions returned by handlers.
///
/// The driver (test harness or production server) executes these against
/// the connection the frame arrived on:
/// - `Acknowledge`: Send the transport's opaque acknowledgement
/// - `SendFrame`: Encode and send the frame back to the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAction {
    /// The frame was applied
    Acknowledge,

    /// Send this frame to the peer
    SendFrame(Frame),
}

/// A command handler.
///
/// Implemented for any `Fn(&Frame) -> Result<Vec<LedgerAction>, LedgerError>`
/// closure, so most handlers are registered inline.
pub trait CommandHandler: Send + Sync {
    /// Process one decoded frame.
    fn handle(&self, frame: &Frame) -> Result<Vec<LedgerAction>, LedgerError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Frame) -> Result<Vec<LedgerAction>, LedgerError> + Send + Sync,
{
    fn handle(&self, frame: &Frame) -> Result<Vec<LedgerAction>, LedgerError> {
        self(frame)
    }
}

/// Dispatch table indexed by command code.
pub struct CommandRouter {
    handlers: [Option<Box<dyn CommandHandler>>; 256],
}

impl CommandRouter {
    /// Create a router with no handlers
    pub fn new() -> Self {
        Self { handlers: std::array::from_fn(|_| None) }
    }

    /// Register `handler` for `code`.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if a handler already owns the code
    pub fn register(
        &mut self,
        code: impl Into<u8>,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), RouterError> {
        let code = code.into();
        let slot = &mut self.handlers[usize::from(code)];
        if slot.is_some() {
            return Err(RouterError::AlreadyRegistered(code));
        }
        *slot = Some(Box::new(handler));
        Ok(())
    }

    /// Whether a handler is registered for `code`.
    pub fn is_registered(&self, code: u8) -> bool {
        self.handlers[usize::from(code)].is_some()
    }

    /// Route a decoded frame to its handler.
    pub fn dispatch(&self, frame: &Frame) -> Result<Vec<LedgerAction>, LedgerError> {
        match &self.handlers[usize::from(frame.command)] {
            Some(handler) => handler.handle(frame),
            None => Err(LedgerError::UnknownCommand(frame.command)),
        }
    }

    /// Decode a raw datagram and route it.
    pub fn dispatch_datagram(&self, bytes: &[u8]) -> Result<Vec<LedgerAction>, LedgerError> {
        let frame = Frame::decode(bytes)?;
        self.dispatch(&frame)
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<u8> =
            (0..=u8::MAX).filter(|&code| self.is_registered(code)).collect();
        f.debug_struct("CommandRouter").field("registered", &registered).finish()
    }
}
