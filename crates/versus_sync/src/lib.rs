//! Versus Sync - real-time game-state synchronizer
//!
//! Keeps a local tic-tac-toe board in step with a server that hosts the
//! game and an AI opponent, over a Socket.IO event channel.
//!
//! # Architecture
//!
//! - **Controller**: optimistic local moves, last-write-wins server snapshots
//! - **Events**: the named-event contract and its JSON payloads
//! - **Transport**: Engine.IO framing over a WebSocket, with scoped listeners
//! - **Session**: one connection driving one controller, with reconnects
//!
//! # Example
//!
//! ```no_run
//! use versus_sync::{Session, SyncConfig, UserCommand};
//!
//! # async fn example() -> Result<(), versus_sync::SyncError> {
//! let session = Session::connect(SyncConfig::default()).await?;
//! let mut view = session.subscribe();
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! tx.send(UserCommand::Quit).ok();
//! session.run(rx).await?;
//! let _ = view.borrow_and_update().status();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backoff;
mod commentary;
mod config;
mod controller;
mod error;
mod events;
mod session;
mod tui;
mod view;
mod wire;

pub mod transport;

pub use transport::EventSink;

// Crate-level exports - Controller
pub use controller::{CONNECTING_TEXT, GameSyncController, NEW_GAME_TEXT, THINKING_TEXT};

// Crate-level exports - Event contract
pub use events::{ConnectionEvent, EventNames, Inbound, Outbound};
pub use wire::{
    CellPatch, Mark, MoveFormat, QueryField, TextNote, ToolReport, WireOptions, decode_board,
    decode_game_over, decode_patch, decode_text, decode_tool_report,
};

// Crate-level exports - View
pub use commentary::{Author, CommentaryLog, Message};
pub use view::{Connectivity, ViewState};

// Crate-level exports - Session and configuration
pub use backoff::{Backoff, BackoffPolicy};
pub use config::{SERVER_URL_ENV, SyncConfig};
pub use session::{Session, UserCommand};

// Crate-level exports - Terminal UI
pub use tui::run_tui;

// Crate-level exports - Errors
pub use error::{SyncError, SyncErrorKind};

// Re-exported board types
pub use versus_board::{Board, Cell, Coord, GameStatus, Outcome, TurnOwner};
