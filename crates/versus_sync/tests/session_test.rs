//! End-to-end session tests against a scripted in-memory server.

use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use versus_sync::transport::{Dialer, Transport};
use versus_sync::{
    BackoffPolicy, Board, Cell, Connectivity, Coord, GameStatus, Outcome, Session, SyncConfig,
    SyncError, UserCommand, ViewState,
};

const OPEN: &str = r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

#[derive(Debug)]
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
        Ok(())
    }
}

/// Hands out prepared transports, one per dial.
#[derive(Debug)]
struct QueuedDialer {
    transports: Mutex<VecDeque<ChannelTransport>>,
}

impl QueuedDialer {
    fn new(transports: impl IntoIterator<Item = ChannelTransport>) -> Self {
        Self {
            transports: Mutex::new(transports.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl Dialer for QueuedDialer {
    async fn dial(&self) -> Result<Box<dyn Transport>, SyncError> {
        let next = self.transports.lock().unwrap().pop_front();
        match next {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(SyncError::transport("nothing listening")),
        }
    }
}

struct FakeServer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    fn push(&self, frame: &str) {
        if let Some(tx) = &self.to_client {
            tx.send(frame.to_string()).unwrap();
        }
    }

    fn emit(&self, name: &str, payload: Value) {
        self.push(&format!("42{}", json!([name, payload])));
    }

    fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Completes the handshake and reads the join request.
    async fn accept(&mut self, sid: &str) {
        self.push(OPEN);
        assert_eq!(self.next_frame().await, "40");
        self.push(&format!("40{}", json!({ "sid": sid })));
        assert_eq!(self.next_event().await, json!(["join_game"]));
    }

    async fn next_frame(&mut self) -> String {
        timeout(Duration::from_secs(2), self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client hung up")
    }

    /// Next event frame, parsed into `[name, payload?]`.
    async fn next_event(&mut self) -> Value {
        let frame = self.next_frame().await;
        let body = frame.strip_prefix("42").expect("event frame");
        serde_json::from_str(body).unwrap()
    }
}

fn pair() -> (ChannelTransport, FakeServer) {
    let (to_client, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_client) = mpsc::unbounded_channel();
    (
        ChannelTransport { incoming, outgoing },
        FakeServer {
            to_client: Some(to_client),
            from_client,
        },
    )
}

fn offline_config() -> SyncConfig {
    SyncConfig::default().with_reconnect(BackoffPolicy::default().with_enabled(false))
}

async fn wait_for(view: &mut watch::Receiver<ViewState>, done: impl Fn(&ViewState) -> bool) {
    timeout(Duration::from_secs(2), async {
        loop {
            if done(&view.borrow_and_update()) {
                return;
            }
            view.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for the view");
}

#[tokio::test]
async fn full_game_over_the_socket() {
    let (transport, mut server) = pair();
    let session = Session::attach(transport, offline_config());
    let mut view = session.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(session.run(cmd_rx));

    server.push(OPEN);
    assert_eq!(server.next_frame().await, "40");
    server.push(r#"40{"sid":"sock-1"}"#);
    assert_eq!(server.next_event().await, json!(["join_game"]));
    wait_for(&mut view, |v| v.connectivity().is_connected()).await;

    server.emit("board_update", json!(["", "", "", "", "", "", "", "", ""]));
    wait_for(&mut view, |v| *v.input_enabled()).await;

    cmd_tx
        .send(UserCommand::Move(Coord::new(0, 0).unwrap()))
        .unwrap();
    assert_eq!(
        server.next_event().await,
        json!(["human_move", { "row": 0, "col": 0 }])
    );
    wait_for(&mut view, |v| *v.status() == GameStatus::AwaitingOpponent).await;

    server.emit("opponent_move", json!({ "row": 1, "col": 1, "value": "O" }));
    server.emit("ai_message", json!({ "text": "Center is mine." }));
    wait_for(&mut view, |v| v.commentary().len() == 1).await;
    assert!(*view.borrow().input_enabled());

    server.emit("game_over", json!({ "winner": "AI", "is_tie": false }));
    wait_for(&mut view, |v| v.accepts_questions()).await;
    assert_eq!(*view.borrow().status(), GameStatus::Over(Outcome::AgentWin));

    cmd_tx
        .send(UserCommand::Ask("good game".to_string()))
        .unwrap();
    assert_eq!(
        server.next_event().await,
        json!(["post_game_query", { "text": "good game", "request_id": 1 }])
    );

    cmd_tx.send(UserCommand::Restart).unwrap();
    assert_eq!(server.next_event().await, json!(["restart_game"]));
    wait_for(&mut view, |v| v.commentary().is_empty() && v.board().is_blank()).await;

    cmd_tx.send(UserCommand::Quit).unwrap();
    assert_eq!(server.next_frame().await, "41");
    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn undecodable_events_do_not_stop_the_session() {
    let (transport, mut server) = pair();
    let session = Session::attach(transport, offline_config());
    let mut view = session.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(session.run(cmd_rx));

    server.push(OPEN);
    assert_eq!(server.next_frame().await, "40");
    server.push(r#"40{}"#);
    server.next_event().await;

    server.emit("board_update", json!({ "unexpected": true }));
    server.emit("status_update", json!({ "text": "still alive" }));
    wait_for(&mut view, |v| v.status_text() == "still alive").await;
    assert_eq!(*view.borrow().status(), GameStatus::Connecting);

    cmd_tx.send(UserCommand::Quit).unwrap();
    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn lost_connection_without_reconnect_ends_the_session() {
    let (transport, mut server) = pair();
    let session = Session::attach(transport, offline_config());
    let mut view = session.subscribe();
    let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(session.run(cmd_rx));

    server.push(OPEN);
    assert_eq!(server.next_frame().await, "40");
    server.push(r#"40{"sid":"s"}"#);
    server.next_event().await;
    wait_for(&mut view, |v| v.connectivity().is_connected()).await;

    server.hang_up();

    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert!(result.is_err());
    wait_for(&mut view, |v| !v.connectivity().is_connected()).await;
}

#[tokio::test]
async fn reconnect_rejoins_with_a_fresh_game() {
    let (first, mut server) = pair();
    let (second, mut second_server) = pair();
    let (third, mut third_server) = pair();
    // One attempt per outage: the second outage only recovers if a
    // successful connection resets the backoff.
    let policy = BackoffPolicy::default()
        .with_initial_delay_ms(10)
        .with_max_attempts(Some(1));
    let session = Session::attach(first, SyncConfig::default().with_reconnect(policy))
        .with_dialer(QueuedDialer::new([second, third]));
    let mut view = session.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(session.run(cmd_rx));

    server.accept("sock-1").await;
    server.emit("board_update", json!(["X", "", "", "", "O", "", "", "", ""]));
    wait_for(&mut view, |v| *v.input_enabled()).await;

    server.hang_up();
    second_server.accept("sock-2").await;
    wait_for(&mut view, |v| {
        *v.connectivity()
            == Connectivity::Connected {
                sid: Some("sock-2".to_string()),
            }
    })
    .await;
    {
        let state = view.borrow();
        assert_eq!(*state.status(), GameStatus::Connecting);
        assert!(state.board().is_blank());
    }

    second_server.emit("board_update", json!(["", "", "", "", "", "", "", "", ""]));
    wait_for(&mut view, |v| *v.status() == GameStatus::InProgress).await;
    cmd_tx
        .send(UserCommand::Move(Coord::new(2, 2).unwrap()))
        .unwrap();
    assert_eq!(
        second_server.next_event().await,
        json!(["human_move", { "row": 2, "col": 2 }])
    );

    second_server.hang_up();
    third_server.accept("sock-3").await;
    wait_for(&mut view, |v| v.connectivity().is_connected()).await;

    let mut expected = Board::new();
    expected.set(Coord::new(0, 0).unwrap(), Cell::Human);
    third_server.emit("board_update", json!(["X", "", "", "", "", "", "", "", ""]));
    wait_for(&mut view, |v| *v.board() == expected).await;

    cmd_tx.send(UserCommand::Quit).unwrap();
    assert_eq!(third_server.next_frame().await, "41");
    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert!(result.is_ok());
}
