//! Assembles a serving node from configuration.

use std::{fs, sync::Arc};

use trustline_core::{CommandRouter, SystemEnv, TrustlineLedger};

use crate::{
    config::ServerConfig,
    error::ServerError,
    server::{Server, UdpTransport},
    storage::{ChainFile, FsStore},
};

/// Ledger type served by `trustline-node`.
pub type NodeLedger = TrustlineLedger<FsStore, SystemEnv>;

/// Open the ledger under `config.data_dir`, creating the directory if
/// needed, and register its handlers on a fresh router.
pub fn build_router(
    config: &ServerConfig,
) -> Result<(Arc<NodeLedger>, CommandRouter), ServerError> {
    fs::create_dir_all(&config.data_dir)?;

    let mut ledger = TrustlineLedger::new(FsStore::new(&config.data_dir), SystemEnv);
    if config.record_transactions {
        ledger = ledger.with_transaction_log(ChainFile::new(config.chain_path()));
    }
    let ledger = Arc::new(ledger);

    let mut router = CommandRouter::new();
    ledger.register_handlers(&mut router)?;

    tracing::debug!(?router, data_dir = %config.data_dir.display(), "ledger opened");
    Ok((ledger, router))
}

/// Bind the socket and build the server, without starting it.
pub async fn bind(config: &ServerConfig) -> Result<Server<UdpTransport>, ServerError> {
    let (_ledger, router) = build_router(config)?;
    let socket = UdpTransport::bind(config.bind).await?;
    Ok(Server::new(socket, router))
}
