//! Node tests over real UDP sockets on loopback
//!
//! Each test starts a node on an ephemeral port with a temporary data
//! directory and talks to it through [`PeerClient`] or a raw socket.

use std::{net::SocketAddr, time::Duration};

use tokio::{net::UdpSocket, sync::oneshot, task::JoinHandle};
use trustline_core::{PeerKey, PeerRecord, PeerStore, SharedSecret, TransactionLog, auth};
use trustline_proto::Frame;
use trustline_server::{
    ACKNOWLEDGEMENT, ChainFile, FsStore, PeerClient, Server, ServerConfig, ServerError,
    UdpTransport, node,
};

const REPLY: Duration = Duration::from_secs(2);
const SILENCE: Duration = Duration::from_millis(200);

struct TestNode {
    addr: SocketAddr,
    config: ServerConfig,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
    _dir: tempfile::TempDir,
}

impl TestNode {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::new(dir.path().join("ledger"));
        config.bind = SocketAddr::from(([127, 0, 0, 1], 0));

        let (_ledger, router) = node::build_router(&config).unwrap();
        FsStore::new(&config.data_dir).register_peer(&peer(), &secret()).unwrap();

        let socket = UdpTransport::bind(config.bind).await.unwrap();
        let server = Server::new(socket, router);
        let addr = server.local_addr().unwrap();

        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = rx.await;
                })
                .await
        });

        Self { addr, config, shutdown: Some(tx), task, _dir: dir }
    }

    fn store(&self) -> FsStore {
        FsStore::new(&self.config.data_dir)
    }

    fn chain(&self) -> ChainFile {
        ChainFile::new(self.config.chain_path())
    }

    async fn client(&self, secret: SharedSecret) -> PeerClient<UdpTransport> {
        let socket = UdpTransport::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        PeerClient::new(socket, self.addr, peer(), secret)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await.unwrap().unwrap();
    }
}

fn peer() -> PeerKey {
    PeerKey::new("alice", "bank.example", "bob").unwrap()
}

fn secret() -> SharedSecret {
    SharedSecret::from_bytes([7; 32])
}

/// Whether anything arrives on `socket` within [`SILENCE`].
async fn hears_reply(socket: &UdpSocket) -> bool {
    let mut buf = [0u8; Frame::SIZE + 1];
    tokio::time::timeout(SILENCE, socket.recv_from(&mut buf)).await.is_ok()
}

#[tokio::test]
async fn accepted_update_is_acknowledged_and_durable() {
    let node = TestNode::start().await;
    let client = node.client(secret()).await;

    assert!(client.set_trustline(1, 500, REPLY).await.unwrap());

    assert_eq!(
        node.store().load_record(&peer()).unwrap(),
        PeerRecord { last_counter: 1, trustline: Some(500) }
    );
    let history = node.chain().load().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.last().unwrap().trustline, 500);

    node.stop().await;
}

#[tokio::test]
async fn replayed_datagram_gets_no_reply() {
    let node = TestNode::start().await;
    let client = node.client(secret()).await;
    let frame = client.set_trustline_frame(1, 500).unwrap();

    let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    raw.send_to(&frame.to_bytes(), node.addr).await.unwrap();

    let mut buf = [0u8; 16];
    let (len, _) = tokio::time::timeout(REPLY, raw.recv_from(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[..len], ACKNOWLEDGEMENT);

    // Captured frame resent verbatim
    raw.send_to(&frame.to_bytes(), node.addr).await.unwrap();
    assert!(!hears_reply(&raw).await);

    assert_eq!(node.store().load_record(&peer()).unwrap().last_counter, 1);
    node.stop().await;
}

#[tokio::test]
async fn rejected_frames_are_silent() {
    let node = TestNode::start().await;
    let client = node.client(secret()).await;
    let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Wrong key
    let forged = node.client(SharedSecret::from_bytes([8; 32])).await;
    raw.send_to(&forged.set_trustline_frame(1, 9).unwrap().to_bytes(), node.addr).await.unwrap();
    assert!(!hears_reply(&raw).await);

    // Unknown command, correctly signed
    let mut unknown = client.set_trustline_frame(2, 9).unwrap();
    unknown.command = 0x7f;
    auth::sign(&mut unknown, &secret());
    raw.send_to(&unknown.to_bytes(), node.addr).await.unwrap();
    assert!(!hears_reply(&raw).await);

    // Truncated and oversized datagrams
    let bytes = client.set_trustline_frame(3, 9).unwrap().to_bytes();
    raw.send_to(&bytes[..Frame::SIZE - 1], node.addr).await.unwrap();
    assert!(!hears_reply(&raw).await);
    let mut oversized = bytes.to_vec();
    oversized.push(0);
    raw.send_to(&oversized, node.addr).await.unwrap();
    assert!(!hears_reply(&raw).await);

    // Negative trust line
    raw.send_to(&client.set_trustline_frame(4, -1).unwrap().to_bytes(), node.addr)
        .await
        .unwrap();
    assert!(!hears_reply(&raw).await);

    assert_eq!(node.store().load_record(&peer()).unwrap(), PeerRecord::default());
    assert!(node.chain().load().unwrap().is_empty());
    node.stop().await;
}

#[tokio::test]
async fn query_returns_signed_value_and_consumes_counter() {
    let node = TestNode::start().await;
    let client = node.client(secret()).await;

    assert_eq!(client.get_trustline(1, REPLY).await.unwrap(), Some(0));
    assert!(client.set_trustline(2, 750, REPLY).await.unwrap());
    assert_eq!(client.get_trustline(3, REPLY).await.unwrap(), Some(750));

    // Counter 3 is spent
    assert_eq!(client.get_trustline(3, SILENCE).await.unwrap(), None);

    assert_eq!(
        node.store().load_record(&peer()).unwrap(),
        PeerRecord { last_counter: 3, trustline: Some(750) }
    );
    node.stop().await;
}

#[tokio::test]
async fn counters_may_skip_ahead() {
    let node = TestNode::start().await;
    let client = node.client(secret()).await;

    assert!(client.set_trustline(10, 1, REPLY).await.unwrap());
    assert!(!client.set_trustline(5, 2, SILENCE).await.unwrap());
    assert!(client.set_trustline(1_000, 3, REPLY).await.unwrap());

    assert_eq!(
        node.store().load_record(&peer()).unwrap(),
        PeerRecord { last_counter: 1_000, trustline: Some(3) }
    );
    node.stop().await;
}

#[tokio::test]
async fn state_survives_node_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::new(dir.path());
    config.bind = SocketAddr::from(([127, 0, 0, 1], 0));
    FsStore::new(&config.data_dir).register_peer(&peer(), &secret()).unwrap();

    for (counter, value) in [(1u32, 100i32), (2, 200)] {
        let server = node::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = rx.await;
                })
                .await
        });

        let socket = UdpTransport::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let client = PeerClient::new(socket, addr, peer(), secret());
        assert!(client.set_trustline(counter, value, REPLY).await.unwrap());
        // The previous instance's counter still applies
        assert!(!client.set_trustline(counter, value, SILENCE).await.unwrap());

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    let history = ChainFile::new(config.chain_path()).load().unwrap();
    let counters: Vec<u32> = history.iter().map(|t| t.counter).collect();
    assert_eq!(counters, [1, 2]);
}
