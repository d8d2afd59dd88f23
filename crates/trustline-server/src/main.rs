//! Trust-line node binary
//!
//! ```text
//! trustline-node serve [--bind ADDR] [--no-history]
//! trustline-node register X SERVER Y [--secret HEX]
//! trustline-node send --to ADDR --secret HEX --counter N [--value V] X SERVER Y
//! trustline-node history
//! ```
//!
//! `--data-dir` (or `TRUSTLINE_DATA_DIR`) selects the ledger directory for
//! every subcommand. Logs go to stderr and honour `RUST_LOG`.

use std::{
    io::{self, Write},
    net::SocketAddr,
    process::ExitCode,
};

use clap::Parser;
use trustline_core::{PeerKey, PeerStore, SharedSecret, TransactionLog, peer::SECRET_SIZE};
use trustline_server::{
    ChainFile, Cli, CliCommand, FsStore, PeerClient, ServerConfig, ServerError, UdpTransport,
    config::{PeerArgs, chain_path},
    node,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(%error, "trustline-node failed");
            ExitCode::FAILURE
        },
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

async fn run(cli: Cli) -> Result<ExitCode, ServerError> {
    let data_dir = cli.data_dir();
    let timeout = cli.command.timeout();

    match cli.command {
        CliCommand::Serve { bind, no_history } => {
            let config = ServerConfig { bind, data_dir, record_transactions: !no_history };
            let server = node::bind(&config).await?;
            server.run_until(shutdown_signal()).await?;
            Ok(ExitCode::SUCCESS)
        },

        CliCommand::Register { peer, secret } => {
            let peer = peer_key(&peer)?;
            let secret = match secret {
                Some(hex) => parse_secret(&hex)?,
                None => generate_secret()?,
            };

            FsStore::new(&data_dir).register_peer(&peer, &secret)?;
            tracing::info!(%peer, "peer registered");

            writeln!(io::stdout().lock(), "{}", hex::encode(secret.as_bytes()))?;
            Ok(ExitCode::SUCCESS)
        },

        CliCommand::Send { to, peer, secret, counter, value, .. } => {
            let client = PeerClient::new(
                UdpTransport::bind(unspecified_for(to)).await?,
                to,
                peer_key(&peer)?,
                parse_secret(&secret)?,
            );
            let timeout = timeout.unwrap_or_default();

            match value {
                Some(value) => {
                    if client.set_trustline(counter, value, timeout).await? {
                        writeln!(io::stdout(), "ACK")?;
                        Ok(ExitCode::SUCCESS)
                    } else {
                        tracing::warn!(peer = %client.peer(), counter, "no acknowledgement");
                        Ok(ExitCode::FAILURE)
                    }
                },
                None => match client.get_trustline(counter, timeout).await? {
                    Some(trustline) => {
                        writeln!(io::stdout(), "{trustline}")?;
                        Ok(ExitCode::SUCCESS)
                    },
                    None => {
                        tracing::warn!(peer = %client.peer(), counter, "no reply");
                        Ok(ExitCode::FAILURE)
                    },
                },
            }
        },

        CliCommand::History => {
            let chain = ChainFile::new(chain_path(&data_dir)).load()?;
            let mut stdout = io::stdout().lock();
            for transaction in &chain {
                writeln!(
                    stdout,
                    "{counter:>10} {timestamp} {x} -> {y}@{server} {trustline} {tag}",
                    counter = transaction.counter,
                    timestamp = transaction.timestamp,
                    x = transaction.x_username.to_str().unwrap_or("?"),
                    y = transaction.y_username.to_str().unwrap_or("?"),
                    server = transaction.y_server_address.to_str().unwrap_or("?"),
                    trustline = transaction.trustline,
                    tag = hex::encode(transaction.signature),
                )?;
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn peer_key(args: &PeerArgs) -> Result<PeerKey, ServerError> {
    Ok(PeerKey::new(&args.x_username, &args.y_server_address, &args.y_username)?)
}

fn parse_secret(text: &str) -> Result<SharedSecret, ServerError> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| ServerError::Config(format!("secret is not valid hex: {e}")))?;
    SharedSecret::from_slice(&bytes).ok_or_else(|| {
        ServerError::Config(format!("secret must be {SECRET_SIZE} bytes, got {}", bytes.len()))
    })
}

fn generate_secret() -> Result<SharedSecret, ServerError> {
    let mut bytes = [0u8; SECRET_SIZE];
    getrandom::fill(&mut bytes).map_err(io::Error::other)?;
    Ok(SharedSecret::from_bytes(bytes))
}

/// Ephemeral local address in the same family as `remote`.
fn unspecified_for(remote: SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "cannot listen for ctrl-c; serving until killed");
        std::future::pending::<()>().await;
    }
}
