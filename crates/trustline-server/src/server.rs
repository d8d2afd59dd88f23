//! UDP driver.
//!
//! Receives datagrams, dispatches them through the [`CommandRouter`], and
//! executes the returned [`LedgerAction`]s against the sender's address.
//! Frames are processed one at a time in arrival order.
//!
//! Rejected frames get no reply at all. A sender cannot tell an unknown peer
//! from a bad tag or a replayed counter, nor any of those from packet loss.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use trustline_core::{CommandRouter, DatagramSocket, LedgerAction};
use trustline_proto::Frame;

use crate::error::ServerError;

/// Reply sent for an accepted `SetTrustline`.
pub const ACKNOWLEDGEMENT: &[u8] = b"ACK";

/// One byte larger than a frame so oversized datagrams are seen as such
/// instead of being silently truncated to a valid length.
const RECV_BUFFER_SIZE: usize = Frame::SIZE + 1;

/// Tokio UDP socket as a [`DatagramSocket`].
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a new socket to `addr`.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self { socket: UdpSocket::bind(addr).await? })
    }

    /// Wrap an already bound socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl DatagramSocket for UdpTransport {
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

/// Serves a [`CommandRouter`] over a datagram socket.
pub struct Server<T> {
    socket: T,
    router: Arc<CommandRouter>,
}

impl<T: DatagramSocket> Server<T> {
    /// Serve `router` on `socket`.
    pub fn new(socket: T, router: impl Into<Arc<CommandRouter>>) -> Self {
        Self { socket, router: router.into() }
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve until the process exits.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// A frame being processed when `shutdown` fires is finished first;
    /// shutdown is only observed between datagrams.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        tokio::pin!(shutdown);

        let addr = self.socket.local_addr()?;
        tracing::info!(%addr, "trust-line node listening");

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(%addr, "trust-line node stopping");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, from)) => self.handle_datagram(&buf[..len], from).await,
                        // ICMP errors from earlier sends surface here on some
                        // platforms; they say nothing about the next datagram.
                        Err(error) => tracing::warn!(%error, "receive failed"),
                    }
                }
            }
        }
    }

    /// Process one datagram from `from` and send any reply.
    pub async fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) {
        match self.router.dispatch_datagram(datagram) {
            Ok(actions) => self.execute(actions, from).await,
            Err(error) if error.is_security_rejection() => {
                tracing::debug!(%from, %error, "frame rejected");
            },
            Err(error) => {
                tracing::error!(%from, %error, "frame dropped after storage failure");
            },
        }
    }

    async fn execute(&self, actions: Vec<LedgerAction>, to: SocketAddr) {
        for action in actions {
            let result = match &action {
                LedgerAction::Acknowledge => self.socket.send_to(ACKNOWLEDGEMENT, to).await,
                LedgerAction::SendFrame(frame) => self.socket.send_to(&frame.to_bytes(), to).await,
            };

            if let Err(error) = result {
                tracing::warn!(%to, %error, ?action, "failed to send reply");
            }
        }
    }
}

impl<T> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("router", &self.router).finish_non_exhaustive()
    }
}
