//! Sending side of a peer relationship.
//!
//! Builds, signs and sends frames to a remote node, then waits for a reply.
//! Because the node never answers a rejected frame, a timeout is the only
//! failure signal; the caller chooses a fresh counter and retries if needed.

use std::{io, net::SocketAddr, time::Duration};

use trustline_core::{DatagramSocket, PeerKey, SharedSecret, auth};
use trustline_proto::{Command, Frame, ProtocolError};

use crate::server::ACKNOWLEDGEMENT;

/// Client for one peer relationship on one remote node.
pub struct PeerClient<T> {
    socket: T,
    server: SocketAddr,
    peer: PeerKey,
    secret: SharedSecret,
}

impl<T: DatagramSocket> PeerClient<T> {
    /// Talk to the node at `server` about `peer`, signing with `secret`.
    pub fn new(socket: T, server: SocketAddr, peer: PeerKey, secret: SharedSecret) -> Self {
        Self { socket, server, peer, secret }
    }

    /// Relationship this client addresses
    pub fn peer(&self) -> &PeerKey {
        &self.peer
    }

    /// Signed `SetTrustline` frame.
    pub fn set_trustline_frame(&self, counter: u32, value: i32) -> Result<Frame, ProtocolError> {
        let mut frame = self.frame(Command::SetTrustline, counter)?;
        frame.set_argument_i32(value);
        auth::sign(&mut frame, &self.secret);
        Ok(frame)
    }

    /// Signed `GetTrustline` frame.
    pub fn get_trustline_frame(&self, counter: u32) -> Result<Frame, ProtocolError> {
        let mut frame = self.frame(Command::GetTrustline, counter)?;
        auth::sign(&mut frame, &self.secret);
        Ok(frame)
    }

    /// Set the trust line. Returns whether the node acknowledged within
    /// `timeout`.
    pub async fn set_trustline(
        &self,
        counter: u32,
        value: i32,
        timeout: Duration,
    ) -> io::Result<bool> {
        let frame = self.set_trustline_frame(counter, value).map_err(invalid_input)?;
        let acked = self
            .exchange(&frame, timeout, |datagram| (datagram == ACKNOWLEDGEMENT).then_some(()))
            .await?;
        Ok(acked.is_some())
    }

    /// Query the trust line. Returns `None` if no authentic reply arrived
    /// within `timeout`.
    pub async fn get_trustline(&self, counter: u32, timeout: Duration) -> io::Result<Option<i32>> {
        let frame = self.get_trustline_frame(counter).map_err(invalid_input)?;
        self.exchange(&frame, timeout, |datagram| self.accept_reply(datagram, counter)).await
    }

    /// A reply counts only if it is signed with our secret and echoes the
    /// request's counter and addressing.
    fn accept_reply(&self, datagram: &[u8], counter: u32) -> Option<i32> {
        let reply = Frame::decode(datagram).ok()?;
        let authentic = reply.command() == Some(Command::GetTrustline)
            && reply.counter == counter
            && PeerKey::from_frame(&reply).is_ok_and(|peer| peer == self.peer)
            && auth::verify(&reply, &self.secret);
        authentic.then(|| reply.argument_i32())
    }

    async fn exchange<R>(
        &self,
        frame: &Frame,
        timeout: Duration,
        accept: impl Fn(&[u8]) -> Option<R>,
    ) -> io::Result<Option<R>> {
        self.socket.send_to(&frame.to_bytes(), self.server).await?;

        let wait = async {
            let mut buf = [0u8; Frame::SIZE + 1];
            loop {
                let (len, from) = self.socket.recv_from(&mut buf).await?;
                if from != self.server {
                    tracing::debug!(%from, "ignoring datagram from unexpected sender");
                    continue;
                }
                if let Some(reply) = accept(&buf[..len]) {
                    return Ok::<_, io::Error>(reply);
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }

    fn frame(&self, command: Command, counter: u32) -> Result<Frame, ProtocolError> {
        let mut frame = Frame::new(command);
        self.peer.address(&mut frame)?;
        frame.counter = counter;
        Ok(frame)
    }
}

fn invalid_input(error: ProtocolError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error)
}
