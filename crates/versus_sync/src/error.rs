//! Error types for the synchronizer and its transport.

use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SyncErrorKind {
    /// Configuration could not be read or parsed.
    #[display("Configuration: {}", _0)]
    Config(String),
    /// An inbound payload did not match any accepted shape.
    #[display("Payload decode: {}", _0)]
    Decode(String),
    /// The peer broke the Engine.IO / Socket.IO framing rules.
    #[display("Protocol: {}", _0)]
    Protocol(String),
    /// The underlying connection failed.
    #[display("Transport: {}", _0)]
    Transport(String),
    /// The connection handle has been shut down or its loop has exited.
    #[display("Not connected")]
    NotConnected,
}

/// Synchronizer error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Sync error: {} at {}:{}", kind, file, line)]
pub struct SyncError {
    /// Error kind.
    pub kind: SyncErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SyncError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: SyncErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for a [`SyncErrorKind::Decode`] error.
    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Decode(message.into()))
    }

    /// Shorthand for a [`SyncErrorKind::Protocol`] error.
    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Protocol(message.into()))
    }

    /// Shorthand for a [`SyncErrorKind::Transport`] error.
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Transport(message.into()))
    }

    /// Shorthand for a [`SyncErrorKind::Config`] error.
    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Config(message.into()))
    }

    /// Shorthand for [`SyncErrorKind::NotConnected`].
    #[track_caller]
    pub fn not_connected() -> Self {
        Self::new(SyncErrorKind::NotConnected)
    }
}

impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::decode(format!("JSON error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    #[track_caller]
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::transport(format!("WebSocket error: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::transport(format!("I/O error: {}", err))
    }
}
