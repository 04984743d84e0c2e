//! Tests for the Socket.IO client over an in-memory transport.

use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use versus_sync::transport::{SocketClient, SocketEvent, SocketOptions, Transport};
use versus_sync::{ConnectionEvent, EventNames, EventSink, Outbound, SyncError, WireOptions};

const OPEN: &str = r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

/// Client half of an in-memory connection.
struct ChannelTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, text: String) -> Result<(), SyncError> {
        self.outgoing
            .send(text)
            .map_err(|_| SyncError::transport("server gone"))
    }

    async fn recv(&mut self) -> Option<Result<String, SyncError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), SyncError> {
        self.incoming.close();
        Ok(())
    }
}

/// Server half: push frames in, read frames out.
struct FakeServer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    fn push(&self, frame: &str) {
        self.to_client.send(frame.to_string()).unwrap();
    }

    async fn next_frame(&mut self) -> String {
        timeout(Duration::from_secs(2), self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client hung up")
    }

    /// Completes the Engine.IO open and namespace connect.
    async fn handshake(&mut self) {
        self.push(OPEN);
        assert_eq!(self.next_frame().await, "40");
        self.push(r#"40{"sid":"sock-1"}"#);
    }
}

fn pair() -> (ChannelTransport, FakeServer) {
    let (to_client, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_client) = mpsc::unbounded_channel();
    (
        ChannelTransport { incoming, outgoing },
        FakeServer {
            to_client,
            from_client,
        },
    )
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SocketEvent>) -> Option<SocketEvent> {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for an event")
}

#[tokio::test]
async fn handshake_joins_namespace() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    assert!(!client.is_connected());

    server.handshake().await;

    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Connection(ConnectionEvent::Connected {
            sid: Some("sock-1".to_string())
        }))
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn emits_before_join_are_flushed_in_order() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    let emitter = client.emitter(EventNames::default(), WireOptions::default());

    emitter.emit(&Outbound::Join).unwrap();
    emitter.emit(&Outbound::Restart).unwrap();
    server.handshake().await;
    next_event(&mut events).await;

    assert_eq!(server.next_frame().await, r#"42["join_game"]"#);
    assert_eq!(server.next_frame().await, r#"42["restart_game"]"#);
}

#[tokio::test]
async fn move_payload_reaches_the_wire() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    server.handshake().await;
    next_event(&mut events).await;

    let emitter = client.emitter(EventNames::default(), WireOptions::default());
    emitter
        .emit(&Outbound::Move(versus_sync::Coord::new(2, 1).unwrap()))
        .unwrap();

    let frame = server.next_frame().await;
    let body = frame.strip_prefix("42").expect("event frame");
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(parsed, json!(["human_move", { "row": 2, "col": 1 }]));
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let (transport, mut server) = pair();
    let (_client, _events) = SocketClient::start(transport, SocketOptions::default());
    server.handshake().await;

    server.push("2");
    assert_eq!(server.next_frame().await, "3");
}

#[tokio::test]
async fn only_subscribed_events_are_delivered() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    let board = client.on("board_update");
    let _status = client.on("status_update");
    server.handshake().await;
    next_event(&mut events).await;

    server.push(r#"42["unknown_event",{"x":1}]"#);
    server.push(r#"42["board_update",["X","","","","","","","",""]]"#);
    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Event {
            name: "board_update".to_string(),
            payload: Some(json!(["X", "", "", "", "", "", "", "", ""])),
        })
    );

    drop(board);
    assert!(!client.listeners().is_listening("board_update"));
    server.push(r#"42["board_update",[]]"#);
    server.push(r#"42["status_update",{"text":"hi"}]"#);
    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Event {
            name: "status_update".to_string(),
            payload: Some(json!({ "text": "hi" })),
        })
    );
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    let _guard = client.on("ai_message");
    server.handshake().await;
    next_event(&mut events).await;

    server.push("");
    server.push("4not json");
    server.push(r#"42["ai_message","still here"]"#);
    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Event {
            name: "ai_message".to_string(),
            payload: Some(json!("still here")),
        })
    );
}

#[tokio::test]
async fn shutdown_disconnects_gracefully() {
    let (transport, mut server) = pair();
    let (mut client, mut events) = SocketClient::start(transport, SocketOptions::default());
    server.handshake().await;
    next_event(&mut events).await;

    client.shutdown().await;

    assert_eq!(server.next_frame().await, "41");
    assert!(matches!(
        next_event(&mut events).await,
        Some(SocketEvent::Connection(ConnectionEvent::Disconnected { .. }))
    ));
    assert!(!client.is_connected());
    assert!(client.emit_raw("join_game", None).is_err());
}

#[tokio::test]
async fn server_disconnect_ends_the_loop() {
    let (transport, mut server) = pair();
    let (client, mut events) = SocketClient::start(transport, SocketOptions::default());
    server.handshake().await;
    next_event(&mut events).await;

    server.push("41");

    assert!(matches!(
        next_event(&mut events).await,
        Some(SocketEvent::Connection(ConnectionEvent::Disconnected { .. }))
    ));
    assert_eq!(next_event(&mut events).await, None);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn refused_namespace_reports_connect_error() {
    let (transport, mut server) = pair();
    let (_client, mut events) = SocketClient::start(transport, SocketOptions::default());

    server.push(OPEN);
    assert_eq!(server.next_frame().await, "40");
    server.push(r#"44{"message":"not authorized"}"#);

    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Connection(ConnectionEvent::ConnectError {
            reason: "not authorized".to_string()
        }))
    );
}

#[tokio::test]
async fn custom_namespace_is_used_on_the_wire() {
    let (transport, mut server) = pair();
    let options = SocketOptions::default().with_namespace("/game");
    let (client, mut events) = SocketClient::start(transport, options);
    let _guard = client.on("board_update");

    server.push(OPEN);
    assert_eq!(server.next_frame().await, "40/game,");
    server.push(r#"40/game,{"sid":"g"}"#);
    next_event(&mut events).await;

    // Events for the default namespace are not ours.
    server.push(r#"42["board_update",[]]"#);
    server.push(r#"42/game,["board_update",[]]"#);
    assert_eq!(
        next_event(&mut events).await,
        Some(SocketEvent::Event {
            name: "board_update".to_string(),
            payload: Some(json!([])),
        })
    );
}
