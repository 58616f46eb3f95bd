// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! End-to-end tests for the hub's text protocol over WebSocket.
//!
//! Each test starts the hub in-process on an OS-assigned port and drives it
//! with real `tokio-tungstenite` clients. A client always asks for its `id`
//! right after connecting: the reply proves its Connect has been processed,
//! so later relays addressed to it cannot race the registration.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relayhub_proto::relay::MAX_BODY_SIZE;
use tokio_tungstenite::tungstenite::Message;

type Ws =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const QUIET_PERIOD: Duration = Duration::from_millis(200);
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the hub in-process and return a ws:// URL.
async fn start_hub() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = relayhub_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start hub");
    (format!("ws://{addr}/ws"), handle)
}

/// A connected client together with the identity the hub assigned to it.
struct TestClient {
    ws: Ws,
    id: u16,
}

impl TestClient {
    async fn connect(url: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        let mut client = Self { ws, id: 0 };
        client.send("id").await;
        client.id = client
            .recv()
            .await
            .strip_prefix("server: ")
            .unwrap()
            .parse()
            .unwrap();
        client
    }

    async fn send(&mut self, text: &str) {
        self.ws.send(Message::text(text)).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        let msg = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
            .await
            .expect("timed out waiting for frame")
            .unwrap()
            .unwrap();
        String::from_utf8(msg.into_data().to_vec()).unwrap()
    }

    async fn request(&mut self, text: &str) -> String {
        self.send(text).await;
        self.recv().await
    }

    /// Asserts that nothing arrives within the quiet period.
    async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(QUIET_PERIOD, self.ws.next()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }
}

#[tokio::test]
async fn id_is_stable_for_a_connection() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;

    assert_eq!(alice.request("id").await, format!("server: {}", alice.id));
    assert_eq!(alice.request("id").await, format!("server: {}", alice.id));
}

#[tokio::test]
async fn list_shows_other_clients_only() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let bob = TestClient::connect(&url).await;
    let carol = TestClient::connect(&url).await;

    let reply = alice.request("list").await;
    let lines: Vec<&str> = reply.lines().collect();

    assert_eq!(lines[0], "server: users list: ");
    assert_eq!(lines.len(), 3);
    let mut others = vec![bob.id, carol.id];
    others.sort_unstable();
    assert_eq!(lines[1], format!("0) {}", others[0]));
    assert_eq!(lines[2], format!("1) {}", others[1]));
    assert!(!reply.contains(&format!(") {}\n", alice.id)));
}

#[tokio::test]
async fn relay_reaches_destination_and_sender_gets_nothing() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let mut bob = TestClient::connect(&url).await;

    alice
        .send(&format!("relay|users={},body=hello bob", bob.id))
        .await;

    assert_eq!(
        bob.recv().await,
        format!("server: {}-> hello bob", alice.id)
    );
    alice.assert_silent().await;
}

#[tokio::test]
async fn relay_to_missing_identity_is_reported() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let mut bob = TestClient::connect(&url).await;

    let missing = if alice.id == 9999 || bob.id == 9999 { "9998" } else { "9999" };
    let reply = alice
        .request(&format!("relay|users={missing},body=hi"))
        .await;

    assert_eq!(reply, format!("server: userid not found: {missing}"));
    bob.assert_silent().await;
}

#[tokio::test]
async fn relay_validation_errors_go_to_sender() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;

    assert_eq!(
        alice.request("relay|body=x").await,
        "server: relay message should contain users and body fields"
    );
    assert_eq!(
        alice.request("relay|body=x,users=1").await,
        "server: relay message should contain users field"
    );
    assert_eq!(
        alice.request("relay|users=1,text=x").await,
        "server: relay message should contain a body field"
    );

    let users = vec!["1"; 256].join(";");
    assert_eq!(
        alice.request(&format!("relay|users={users},body=x")).await,
        "server: max receivers per message exceeded"
    );
}

#[tokio::test]
async fn body_size_limit_is_exact() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let mut bob = TestClient::connect(&url).await;

    let too_big = "x".repeat(MAX_BODY_SIZE + 1);
    let reply = alice
        .request(&format!("relay|users={},body={too_big}", bob.id))
        .await;
    assert_eq!(reply, "server: message body can't exceed 1024kb");
    bob.assert_silent().await;

    let at_limit = "x".repeat(MAX_BODY_SIZE);
    alice
        .send(&format!("relay|users={},body={at_limit}", bob.id))
        .await;
    let delivered = bob.recv().await;
    assert_eq!(
        delivered.len(),
        format!("server: {}-> ", alice.id).len() + MAX_BODY_SIZE
    );
}

#[tokio::test]
async fn concurrent_relays_arrive_whole() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let mut bob = TestClient::connect(&url).await;
    let mut carol = TestClient::connect(&url).await;
    let mut dave = TestClient::connect(&url).await;

    let targets = format!("{};{}", carol.id, dave.id);
    let (alice_id, bob_id) = (alice.id, bob.id);
    let from_alice = format!("relay|users={targets},body=from alice");
    let from_bob = format!("relay|users={targets},body=from bob");
    tokio::join!(alice.send(&from_alice), bob.send(&from_bob));

    let carol_frames = vec![carol.recv().await, carol.recv().await];
    let dave_frames = vec![dave.recv().await, dave.recv().await];

    // Both destinations see the two relays in the hub's processing order.
    assert_eq!(carol_frames, dave_frames);
    let mut frames = carol_frames;
    frames.sort();
    let mut expected = vec![
        format!("server: {alice_id}-> from alice"),
        format!("server: {bob_id}-> from bob"),
    ];
    expected.sort();
    assert_eq!(frames, expected);
}

#[tokio::test]
async fn disconnected_client_is_removed_from_registry() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;
    let bob = TestClient::connect(&url).await;
    let bob_id = bob.id;

    drop(bob);
    tokio::time::sleep(QUIET_PERIOD).await;

    assert_eq!(alice.request("list").await, "server: users list: \n");
    assert_eq!(
        alice
            .request(&format!("relay|users={bob_id},body=are you there"))
            .await,
        format!("server: userid not found: {bob_id}")
    );
}

#[tokio::test]
async fn hub_survives_client_churn() {
    let (url, _handle) = start_hub().await;
    let mut alice = TestClient::connect(&url).await;

    for _ in 0..10 {
        let mut c = TestClient::connect(&url).await;
        assert_eq!(c.request("hello").await, "server: command not recognized");
    }
    tokio::time::sleep(QUIET_PERIOD).await;

    assert_eq!(alice.request("list").await, "server: users list: \n");
}
