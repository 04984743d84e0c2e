//! Owned Socket.IO connection handle and its background loop.
//!
//! [`SocketClient`] is a thin handle over a task that multiplexes the
//! transport, outbound emits and shutdown with `tokio::select!`. Inbound
//! events leave the task on an unbounded channel in arrival order; nothing
//! is dropped or coalesced.

use super::engine_io::{DEFAULT_NAMESPACE, EnginePacket, SocketPacket};
use super::listeners::{Listeners, Subscription};
use super::{EventSink, Transport};
use crate::error::SyncError;
use crate::events::{ConnectionEvent, EventNames, Outbound};
use crate::wire::WireOptions;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Connection options.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct SocketOptions {
    /// Socket.IO namespace to join.
    #[setters(into)]
    namespace: String,
    /// How long [`SocketClient::shutdown`] waits for a graceful close, in milliseconds.
    shutdown_timeout_ms: u64,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            shutdown_timeout_ms: 1000,
        }
    }
}

/// What the connection loop hands to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// A named event someone is listening to.
    Event {
        /// Event name.
        name: String,
        /// First argument after the name, if any.
        payload: Option<Value>,
    },
    /// Connection lifecycle change.
    Connection(ConnectionEvent),
}

#[derive(Debug)]
enum Command {
    Emit {
        name: String,
        payload: Option<Value>,
    },
}

/// Owned handle to one Socket.IO connection.
///
/// Dropping the handle aborts the connection loop; call
/// [`SocketClient::shutdown`] first for a graceful close.
pub struct SocketClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    listeners: Listeners,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl SocketClient {
    /// Starts the connection loop over an open transport.
    ///
    /// The loop performs the Socket.IO handshake on its own; emits queued
    /// before the namespace is joined are flushed once it is.
    #[must_use = "the event receiver must be used to receive events"]
    #[instrument(skip(transport))]
    pub fn start(
        transport: impl Transport,
        options: SocketOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let listeners = Listeners::new();
        let connected = Arc::new(AtomicBool::new(false));

        let connection = ConnectionLoop {
            transport,
            namespace: options.namespace.clone(),
            event_tx,
            listeners: listeners.clone(),
            connected: Arc::clone(&connected),
            pending: VecDeque::new(),
            joined: false,
        };
        let task = tokio::spawn(connection.run(cmd_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            listeners,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: Duration::from_millis(options.shutdown_timeout_ms),
        };
        (client, event_rx)
    }

    /// Listener registry consulted by the loop.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Registers a listener for `name`.
    pub fn on(&self, name: impl Into<String>) -> Subscription {
        self.listeners.on(name)
    }

    /// Queues a raw named event.
    pub fn emit_raw(&self, name: &str, payload: Option<Value>) -> Result<(), SyncError> {
        self.cmd_tx
            .send(Command::Emit {
                name: name.to_string(),
                payload,
            })
            .map_err(|_| SyncError::not_connected())
    }

    /// Creates an [`EventSink`] that encodes contract events for this connection.
    pub fn emitter(&self, names: EventNames, wire: WireOptions) -> Emitter {
        Emitter {
            cmd_tx: self.cmd_tx.clone(),
            names: Arc::new(names),
            wire,
        }
    }

    /// True once the namespace is joined and until the connection ends.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Closes the connection, waiting up to the configured timeout.
    #[instrument(skip(self))]
    pub async fn shutdown(&mut self) {
        debug!("Socket shutdown requested");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!(error = %join_err, "Connection loop failed"),
                Err(_) => {
                    warn!("Connection loop did not exit in time; aborting");
                    task.abort();
                }
            }
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("connected", &self.is_connected())
            .field("listeners", &self.listeners.len())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// [`EventSink`] bound to one connection.
#[derive(Debug, Clone)]
pub struct Emitter {
    cmd_tx: mpsc::UnboundedSender<Command>,
    names: Arc<EventNames>,
    wire: WireOptions,
}

impl EventSink for Emitter {
    #[instrument(skip(self))]
    fn emit(&self, event: &Outbound) -> Result<(), SyncError> {
        let name = event.name(&self.names).to_string();
        let payload = event.payload(&self.wire);
        debug!(name = %name, ?payload, "Emitting");
        self.cmd_tx
            .send(Command::Emit { name, payload })
            .map_err(|_| SyncError::not_connected())
    }
}

enum Flow {
    Continue,
    Stop,
}

struct ConnectionLoop<T> {
    transport: T,
    namespace: String,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
    listeners: Listeners,
    connected: Arc<AtomicBool>,
    /// Frames emitted before the namespace connect was acknowledged.
    pending: VecDeque<String>,
    joined: bool,
}

impl<T: Transport> ConnectionLoop<T> {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        debug!(namespace = %self.namespace, "Connection loop started");

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Emit { name, payload }) => {
                        let frame = SocketPacket::event(&self.namespace, &name, payload).to_frame();
                        if self.joined {
                            if let Err(e) = self.transport.send(frame).await {
                                error!(error = %e, "Send failed");
                                self.disconnected(Some(e.to_string()));
                                break;
                            }
                        } else {
                            debug!(name = %name, "Queued until namespace is joined");
                            self.pending.push_back(frame);
                        }
                    }
                    None => {
                        debug!("Command channel closed");
                        self.close_gracefully().await;
                        break;
                    }
                },

                _ = &mut shutdown_rx => {
                    self.close_gracefully().await;
                    break;
                }

                incoming = self.transport.recv() => match incoming {
                    Some(Ok(text)) => match self.on_frame(&text).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break,
                        Err(e) => {
                            error!(error = %e, "Send failed while handling frame");
                            self.disconnected(Some(e.to_string()));
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        error!(error = %e, "Receive failed");
                        self.disconnected(Some(e.to_string()));
                        break;
                    }
                    None => {
                        info!("Server closed the connection");
                        self.disconnected(None);
                        break;
                    }
                },
            }
        }

        self.connected.store(false, Ordering::Release);
        debug!("Connection loop exited");
    }

    /// Handles one text frame. Malformed frames are logged and skipped.
    async fn on_frame(&mut self, text: &str) -> Result<Flow, SyncError> {
        let packet = match EnginePacket::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, frame = %text, "Skipping malformed frame");
                return Ok(Flow::Continue);
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                debug!(sid = %handshake.sid(), ping_interval = handshake.ping_interval(), "Engine.IO session open");
                self.transport
                    .send(SocketPacket::connect(&self.namespace).to_frame())
                    .await?;
            }
            EnginePacket::Ping(data) => {
                self.transport.send(EnginePacket::Pong(data).encode()).await?;
            }
            EnginePacket::Close => {
                info!("Server closed the Engine.IO session");
                self.disconnected(Some("server closed session".to_string()));
                return Ok(Flow::Stop);
            }
            EnginePacket::Message(body) => return self.on_message(&body).await,
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
        Ok(Flow::Continue)
    }

    async fn on_message(&mut self, body: &str) -> Result<Flow, SyncError> {
        let packet = match SocketPacket::decode(body) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, body = %body, "Skipping malformed packet");
                return Ok(Flow::Continue);
            }
        };
        if packet.namespace() != self.namespace {
            debug!(namespace = %packet.namespace(), "Ignoring packet for another namespace");
            return Ok(Flow::Continue);
        }

        match packet {
            SocketPacket::Connect { data, .. } => {
                let sid = data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                info!(?sid, "Namespace joined");
                self.joined = true;
                self.connected.store(true, Ordering::Release);
                self.deliver(SocketEvent::Connection(ConnectionEvent::Connected { sid }));
                while let Some(frame) = self.pending.pop_front() {
                    self.transport.send(frame).await?;
                }
            }
            SocketPacket::Disconnect { .. } => {
                info!("Server disconnected the namespace");
                self.disconnected(Some("server disconnected".to_string()));
                return Ok(Flow::Stop);
            }
            SocketPacket::Event { name, args, .. } => {
                if self.listeners.is_listening(&name) {
                    let payload = args.into_iter().next();
                    self.deliver(SocketEvent::Event { name, payload });
                } else {
                    debug!(name = %name, "No listener; event dropped");
                }
            }
            SocketPacket::Ack { ack, .. } => debug!(ack, "Ignoring acknowledgement"),
            SocketPacket::ConnectError { data, .. } => {
                let reason = data
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string());
                warn!(reason = %reason, "Namespace connect refused");
                self.deliver(SocketEvent::Connection(ConnectionEvent::ConnectError { reason }));
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    async fn close_gracefully(&mut self) {
        debug!("Closing connection");
        if self.joined {
            let frame = SocketPacket::Disconnect {
                namespace: self.namespace.clone(),
            }
            .to_frame();
            if let Err(e) = self.transport.send(frame).await {
                debug!(error = %e, "Disconnect packet not sent");
            }
        }
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "Transport close failed");
        }
        self.disconnected(Some("client shut down".to_string()));
    }

    fn disconnected(&mut self, reason: Option<String>) {
        self.joined = false;
        self.connected.store(false, Ordering::Release);
        self.deliver(SocketEvent::Connection(ConnectionEvent::Disconnected { reason }));
    }

    fn deliver(&self, event: SocketEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
