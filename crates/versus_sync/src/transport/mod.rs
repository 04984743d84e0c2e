//! Bidirectional named-event channel to the game server.
//!
//! The stack, bottom up:
//! - [`Transport`] moves text frames (a WebSocket in production, channels in tests),
//!   and a [`Dialer`] opens a fresh one for every (re)connect,
//! - [`engine_io`] frames Socket.IO packets inside those text frames,
//! - [`SocketClient`] owns the connection loop and the listener registry,
//! - [`EventSink`] is the only piece the synchronizer sees.

pub mod engine_io;
mod listeners;
mod socket;
mod websocket;

pub use listeners::{Listeners, Subscription};
pub use socket::{Emitter, SocketClient, SocketEvent, SocketOptions};
pub use websocket::{WebSocketDialer, WebSocketTransport};

use crate::error::SyncError;
use crate::events::Outbound;

/// Moves text frames to and from the server.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), SyncError>;

    /// Receives the next text frame; `None` once the peer has closed.
    ///
    /// Must be cancel-safe: it is polled inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<String, SyncError>>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), SyncError>;
}

#[async_trait::async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, text: String) -> Result<(), SyncError> {
        (**self).send(text).await
    }

    async fn recv(&mut self) -> Option<Result<String, SyncError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), SyncError> {
        (**self).close().await
    }
}

/// Opens transports to the game server.
#[async_trait::async_trait]
pub trait Dialer: Send + Sync + std::fmt::Debug + 'static {
    /// Opens a new connection.
    async fn dial(&self) -> Result<Box<dyn Transport>, SyncError>;
}

/// Outbound half of the event channel, injected into the synchronizer.
///
/// Emitting never waits for the server; it only queues the event.
pub trait EventSink {
    /// Queues an outbound event.
    fn emit(&self, event: &Outbound) -> Result<(), SyncError>;
}
