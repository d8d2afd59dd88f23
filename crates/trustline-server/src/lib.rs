//! Trust-line node
//!
//! Production wiring around `trustline-core`: a UDP driver, filesystem
//! storage, a sending client, and command-line configuration.
//!
//! # Components
//!
//! - [`server`]: Datagram receive loop executing ledger actions
//! - [`client`]: Signs commands and waits for replies
//! - [`storage`]: Filesystem peer store and transaction chain
//! - [`node`]: Builds a ledger and router from configuration
//! - [`config`]: Command-line arguments and defaults
//! - [`error`]: Server error types

pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod server;
pub mod storage;

pub use client::PeerClient;
pub use config::{Cli, CliCommand, ServerConfig};
pub use error::ServerError;
pub use server::{ACKNOWLEDGEMENT, Server, UdpTransport};
pub use storage::{ChainFile, FsStore};
