//! Transport abstraction for datagram protocols.
//!
//! Abstracts over unreliable datagram sockets. Production uses Tokio's UDP
//! socket, tests use Turmoil's simulated one. The ledger never sees the
//! transport: drivers receive a datagram, dispatch it, and execute the
//! returned actions against the sender's address.

use std::{io, net::SocketAddr};

use async_trait::async_trait;

/// An unconnected datagram socket.
///
/// Delivery is best effort: datagrams may be lost, duplicated or reordered,
/// which is why every command carries its own counter.
#[async_trait]
pub trait DatagramSocket: Send + Sync + 'static {
    /// Receive one datagram.
    ///
    /// Returns the number of bytes written to `buf` and the sender. Bytes
    /// beyond `buf.len()` are discarded by the socket.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to `target`.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Address this socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}
