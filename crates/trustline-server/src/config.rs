//! Command-line and node configuration.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand};

/// Default UDP port for trust-line nodes
pub const DEFAULT_PORT: u16 = 2012;

/// File name of the transaction chain inside the data directory
pub const CHAIN_FILE_NAME: &str = "transactions.chain";

/// Trust-line node.
#[derive(Parser, Debug)]
#[command(name = "trustline-node", version, about)]
pub struct Cli {
    /// Directory holding peer state and the transaction chain
    #[arg(long, global = true, env = "TRUSTLINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Operation to run
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Top-level operations.
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Serve the ledger over UDP
    Serve {
        /// Address to bind
        #[arg(long, env = "TRUSTLINE_BIND", default_value_t = default_bind())]
        bind: SocketAddr,

        /// Do not record accepted updates in the transaction chain
        #[arg(long)]
        no_history: bool,
    },

    /// Provision a peer relationship with a shared secret
    Register {
        /// Relationship to provision
        #[command(flatten)]
        peer: PeerArgs,

        /// Hex-encoded 32-byte secret; generated when omitted
        #[arg(long)]
        secret: Option<String>,
    },

    /// Send one signed command to a remote node
    Send {
        /// Remote node address
        #[arg(long)]
        to: SocketAddr,

        /// Relationship the command addresses
        #[command(flatten)]
        peer: PeerArgs,

        /// Hex-encoded 32-byte shared secret
        #[arg(long)]
        secret: String,

        /// Counter for this command; must exceed every counter already used
        #[arg(long)]
        counter: u32,

        /// New trust line; queries the current value when omitted
        #[arg(long)]
        value: Option<i32>,

        /// Seconds to wait for a reply
        #[arg(long, default_value_t = 2)]
        timeout: u64,
    },

    /// Print the transaction chain
    History,
}

/// Peer triple as given on the command line.
#[derive(Args, Debug, Clone)]
pub struct PeerArgs {
    /// Local account name
    pub x_username: String,
    /// Remote node address as recorded in frames
    pub y_server_address: String,
    /// Remote account name
    pub y_username: String,
}

/// Settings for a serving node.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: SocketAddr,
    /// Root of peer state
    pub data_dir: PathBuf,
    /// Append accepted updates to the transaction chain
    pub record_transactions: bool,
}

impl ServerConfig {
    /// Defaults for `data_dir`: bind on all interfaces and record history.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { bind: default_bind(), data_dir: data_dir.into(), record_transactions: true }
    }

    /// Location of the transaction chain
    pub fn chain_path(&self) -> PathBuf {
        chain_path(&self.data_dir)
    }
}

/// Location of the transaction chain under `data_dir`.
pub fn chain_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CHAIN_FILE_NAME)
}

/// `0.0.0.0:2012`
pub fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

/// `$HOME/.ripple`, or `./.ripple` without a home directory.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".ripple")
}

impl Cli {
    /// Data directory from flags, environment, or the default.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

impl CliCommand {
    /// Reply timeout for `send`.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Send { timeout, .. } => Some(Duration::from_secs(*timeout)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["trustline-node", "serve"]).unwrap();
        match cli.command {
            CliCommand::Serve { bind, no_history } => {
                assert_eq!(bind, default_bind());
                assert!(!no_history);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["trustline-node", "history", "--data-dir", "/tmp/ledger"])
            .unwrap();
        assert_eq!(cli.data_dir(), PathBuf::from("/tmp/ledger"));
    }

    #[test]
    fn send_without_value_is_a_query() {
        let cli = Cli::try_parse_from([
            "trustline-node",
            "send",
            "--to",
            "127.0.0.1:2012",
            "--secret",
            "00",
            "--counter",
            "7",
            "alice",
            "bank.example",
            "bob",
        ])
        .unwrap();

        assert_eq!(cli.command.timeout(), Some(Duration::from_secs(2)));
        match cli.command {
            CliCommand::Send { peer, counter, value, .. } => {
                assert_eq!(peer.x_username, "alice");
                assert_eq!(peer.y_server_address, "bank.example");
                assert_eq!(peer.y_username, "bob");
                assert_eq!(counter, 7);
                assert_eq!(value, None);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn register_requires_full_triple() {
        assert!(Cli::try_parse_from(["trustline-node", "register", "alice", "host"]).is_err());
    }

    #[test]
    fn chain_lives_in_data_dir() {
        let config = ServerConfig::new("/srv/ledger");
        assert_eq!(config.chain_path(), PathBuf::from("/srv/ledger/transactions.chain"));
        assert!(config.record_transactions);
    }
}
