//! Trust-line node core logic
//!
//! Authenticated command processing for a two-party trust-line ledger: a
//! frame arrives, its tag and counter are checked against per-peer state, and
//! the resulting mutation is committed durably.
//!
//! # Architecture
//!
//! Handlers never touch the network. They take a decoded frame and return
//! declarative [`router::LedgerAction`]s (acknowledge, send a frame); the
//! driver that owns the socket executes them against whatever connection
//! context it holds. Persistence sits behind the [`storage::PeerStore`] and
//! [`chain::TransactionLog`] traits, and wall-clock time behind
//! [`env::Environment`], so the same ledger runs against the filesystem in
//! production and against in-memory stores in tests and simulation.
//!
//! # Rejections
//!
//! Every security rejection (unknown command, malformed frame, unknown peer,
//! bad tag, stale counter, malformed argument) is reported to the caller as a
//! [`LedgerError`] but must never be distinguishable on the wire. See
//! [`LedgerError::is_security_rejection`].
//!
//! # Components
//!
//! - [`auth`]: Frame tag computation and timing-safe verification
//! - [`router`]: Command code to handler dispatch
//! - [`ledger`]: Verification and trust-line mutation
//! - [`chain`]: Append-only transaction history
//! - [`storage`]: Peer store abstraction and in-memory implementation
//! - [`locks`]: Per-peer single-writer locks
//! - [`peer`]: Peer relationship keys, secrets and records
//! - [`mod@env`]: Environment abstraction (time)
//! - [`transport`]: Datagram transport abstraction
//! - [`error`]: Ledger and router error types

pub mod auth;
pub mod chain;
pub mod env;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod peer;
pub mod router;
pub mod storage;
pub mod transport;

pub use chain::{MemoryTransactionLog, Transaction, TransactionChain, TransactionLog};
pub use env::{Environment, SystemEnv};
pub use error::{LedgerError, RouterError};
pub use ledger::TrustlineLedger;
pub use peer::{PeerKey, PeerRecord, SharedSecret};
pub use router::{CommandHandler, CommandRouter, LedgerAction};
pub use storage::{MemoryStore, PeerStore, StorageError};
pub use transport::DatagramSocket;
