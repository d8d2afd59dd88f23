//! Deterministic simulation harness for trust-line nodes.
//!
//! Turmoil-backed implementations of the [`Environment`] and
//! [`DatagramSocket`] traits, so the production [`Server`] driver and
//! [`PeerClient`] run unchanged over a simulated, lossy network.
//!
//! [`Server`]: trustline_server::Server
//! [`PeerClient`]: trustline_server::PeerClient

#![forbid(unsafe_code)]

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use trustline_core::{
    CommandRouter, DatagramSocket, Environment, MemoryStore, MemoryTransactionLog, RouterError,
    TrustlineLedger,
};

/// Port simulated nodes listen on
pub const NODE_PORT: u16 = 2012;

/// Unix time at which every simulation starts
pub const SIM_EPOCH: u64 = 1_700_000_000;

/// Ledger type used by simulated nodes
pub type SimLedger = TrustlineLedger<MemoryStore, SimEnv>;

/// Turmoil UDP socket as a [`DatagramSocket`].
pub struct SimSocket {
    socket: turmoil::net::UdpSocket,
}

impl SimSocket {
    /// Bind inside the current simulated host.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self { socket: turmoil::net::UdpSocket::bind(addr).await? })
    }

    /// Bind the node port on all interfaces.
    pub async fn bind_node() -> io::Result<Self> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], NODE_PORT))).await
    }
}

#[async_trait]
impl DatagramSocket for SimSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, target).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Simulated wall clock: [`SIM_EPOCH`] plus virtual simulation time.
///
/// Outside a running simulation the clock reads [`SIM_EPOCH`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl Environment for SimEnv {
    fn unix_time(&self) -> u64 {
        SIM_EPOCH + turmoil::sim_elapsed().unwrap_or_default().as_secs()
    }
}

/// In-memory ledger with a history log, shared between a simulated host and
/// the test that inspects it afterwards.
pub fn sim_ledger(store: MemoryStore) -> Arc<SimLedger> {
    Arc::new(
        TrustlineLedger::new(store, SimEnv).with_transaction_log(MemoryTransactionLog::new()),
    )
}

/// Router serving `ledger`.
pub fn sim_router(ledger: &Arc<SimLedger>) -> Result<CommandRouter, RouterError> {
    let mut router = CommandRouter::new();
    ledger.register_handlers(&mut router)?;
    Ok(router)
}

/// Address of the node on simulated host `host`.
pub fn node_addr(host: &str) -> SocketAddr {
    SocketAddr::new(turmoil::lookup(host), NODE_PORT)
}
