//! Client-side game-state synchronizer.
//!
//! The controller keeps a local view of a game whose authoritative state
//! lives on the server. Local moves are applied optimistically and sent;
//! whatever the server pushes next wins. There is no rollback and no retry:
//! a rejected move stays on the board until the next snapshot replaces it.

use crate::commentary::{Author, CommentaryLog, Message};
use crate::events::{ConnectionEvent, Inbound, Outbound};
use crate::transport::EventSink;
use crate::view::{Connectivity, ViewState};
use crate::wire::{CellPatch, TextNote, ToolReport};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use versus_board::{Board, Cell, Coord, GameStatus, Outcome, TurnOwner};

/// Status line while waiting for the join to be acknowledged.
pub const CONNECTING_TEXT: &str = "Connecting...";

/// Status line after the local player moves.
pub const THINKING_TEXT: &str = "AI is thinking...";

/// Status line after a local restart.
pub const NEW_GAME_TEXT: &str = "New game. Your move.";

/// Synchronizes the local board with the server over an injected [`EventSink`].
#[derive(Debug)]
pub struct GameSyncController<S: EventSink> {
    sink: S,
    board: Board,
    status: GameStatus,
    status_text: String,
    pulse: Option<Coord>,
    commentary: CommentaryLog,
    connectivity: Connectivity,
    last_error: Option<String>,
    show_server_errors: bool,
    next_request_id: u64,
    view_tx: watch::Sender<ViewState>,
}

impl<S: EventSink> GameSyncController<S> {
    /// Creates a controller that emits through `sink`.
    ///
    /// The board starts empty and the status starts at
    /// [`GameStatus::Connecting`]; nothing is sent until [`initialize`](Self::initialize).
    pub fn new(sink: S) -> Self {
        let board = Board::new();
        let commentary = CommentaryLog::new();
        let connectivity = Connectivity::default();
        let view = ViewState::build(
            &board,
            GameStatus::Connecting,
            CONNECTING_TEXT,
            None,
            &commentary,
            &connectivity,
            None,
        );
        let (view_tx, _) = watch::channel(view);
        Self {
            sink,
            board,
            status: GameStatus::Connecting,
            status_text: CONNECTING_TEXT.to_string(),
            pulse: None,
            commentary,
            connectivity,
            last_error: None,
            show_server_errors: true,
            next_request_id: 1,
            view_tx,
        }
    }

    /// Whether server error events replace the status line.
    pub fn with_show_server_errors(mut self, show: bool) -> Self {
        self.show_server_errors = show;
        self
    }

    /// Subscribes a rendering surface to view updates.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Current view snapshot.
    pub fn view(&self) -> ViewState {
        self.view_tx.borrow().clone()
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Stored lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Whose turn the board says it is.
    pub fn turn_owner(&self) -> TurnOwner {
        self.board.turn_owner()
    }

    /// Status line text.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Chat history.
    pub fn commentary(&self) -> &CommentaryLog {
        &self.commentary
    }

    /// Connection indicator.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The injected sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Swaps in a sink for a new connection.
    pub fn reattach(&mut self, sink: S) {
        self.sink = sink;
    }

    /// Requests a game from the server and resets the local view.
    #[instrument(skip(self))]
    pub fn initialize(&mut self) {
        info!("Joining game");
        self.board = Board::new();
        self.status = GameStatus::Connecting;
        self.status_text = CONNECTING_TEXT.to_string();
        self.pulse = None;
        self.last_error = None;
        self.send(Outbound::Join);
        self.publish();
    }

    /// Places a human piece optimistically and sends the move.
    ///
    /// Silently ignored unless the cell is empty, the game is in progress
    /// and it is the human's turn, checked in that order. Returns whether
    /// the move was sent.
    #[instrument(skip(self))]
    pub fn submit_move(&mut self, row: usize, col: usize) -> bool {
        let Some(coord) = Coord::new(row, col) else {
            debug!("Move outside the board ignored");
            return false;
        };
        if !self.board.get(coord).is_empty() {
            debug!(%coord, "Cell not empty");
            return false;
        }
        if self.status != GameStatus::InProgress {
            debug!(status = %self.status, "Game not in progress");
            return false;
        }
        if self.board.turn_owner() != TurnOwner::Human {
            debug!("Not the human's turn");
            return false;
        }

        info!(%coord, "Submitting move");
        self.board.set(coord, Cell::Human);
        self.pulse = None;
        self.status_text = THINKING_TEXT.to_string();
        self.send(Outbound::Move(coord));
        self.publish();
        true
    }

    /// Replaces the board with a server snapshot.
    ///
    /// The server is authoritative: the snapshot is applied as is, even when
    /// it breaks turn parity. The first snapshot after joining moves the game
    /// to [`GameStatus::InProgress`].
    #[instrument(skip(self, board))]
    pub fn handle_authoritative_board(&mut self, board: Board) {
        if !board.parity_ok() {
            warn!(
                human = board.count(Cell::Human),
                agent = board.count(Cell::Agent),
                "Snapshot breaks turn parity; applying it anyway"
            );
        }

        let mut changed = false;
        if self.status == GameStatus::Connecting {
            info!("First snapshot received; game in progress");
            self.status = GameStatus::InProgress;
            changed = true;
        }
        if self.board != board {
            debug!(board = %board.display(), "Applying snapshot");
            self.board = board;
            changed = true;
        }
        if self.pulse.take().is_some() {
            changed = true;
        }
        if changed {
            self.publish();
        }
    }

    /// Applies a single-cell update from the server.
    #[instrument(skip(self))]
    pub fn handle_opponent_move(&mut self, patch: CellPatch) {
        if self.status != GameStatus::InProgress {
            warn!(status = %self.status, "Move event outside a live game ignored");
            return;
        }
        let coord = *patch.coord();
        let mut next = self.board.clone();
        next.set(coord, *patch.cell());
        if !next.parity_ok() {
            warn!(%coord, "Move event breaks turn parity; waiting for a snapshot");
            return;
        }
        debug!(%coord, cell = %patch.cell(), "Applying move event");
        self.board = next;
        self.pulse = patch.pulse().then_some(coord);
        self.publish();
    }

    /// Applies an agent tool result: snapshot first, then status text.
    #[instrument(skip(self, report))]
    pub fn handle_tool_executed(&mut self, report: ToolReport) {
        let (board, message) = (report.board().clone(), report.message().clone());
        if let Some(board) = board {
            self.handle_authoritative_board(board);
        }
        if let Some(message) = message {
            self.handle_status_text(message);
        }
    }

    /// Replaces the status line.
    #[instrument(skip(self))]
    pub fn handle_status_text(&mut self, text: String) {
        self.status_text = text;
        self.publish();
    }

    /// Ends the game and freezes input.
    #[instrument(skip(self))]
    pub fn handle_game_over(&mut self, outcome: Outcome) {
        if self.status != GameStatus::InProgress {
            warn!(status = %self.status, %outcome, "Game-over event outside a live game ignored");
            return;
        }
        info!(%outcome, "Game over");
        self.status = GameStatus::Over(outcome);
        self.status_text = outcome.result_message().to_string();
        self.pulse = None;
        self.publish();
    }

    /// Logs a rejected move. The board is left alone until the next snapshot.
    #[instrument(skip(self))]
    pub fn handle_invalid_move(&mut self, reason: String) {
        warn!(reason = %reason, "Server rejected move");
    }

    /// Appends agent commentary in arrival order.
    #[instrument(skip(self, note))]
    pub fn handle_commentary(&mut self, note: TextNote) {
        debug!(in_reply_to = ?note.in_reply_to(), "Agent commentary");
        self.commentary.push(Message::new(
            Author::Agent,
            note.text().clone(),
            *note.in_reply_to(),
        ));
        self.publish();
    }

    /// Records a server-side error, optionally showing it in the status line.
    #[instrument(skip(self))]
    pub fn handle_server_error(&mut self, message: String) {
        warn!(message = %message, "Server reported an error");
        if self.show_server_errors {
            self.status_text = format!("Error: {}", message);
        }
        self.last_error = Some(message);
        self.publish();
    }

    /// Updates the connection indicator. Game state is untouched.
    #[instrument(skip(self))]
    pub fn handle_connection(&mut self, event: ConnectionEvent) {
        self.connectivity = match event {
            ConnectionEvent::Connected { sid } => Connectivity::Connected { sid },
            ConnectionEvent::Disconnected { .. } => Connectivity::Disconnected,
            ConnectionEvent::ConnectError { reason } => Connectivity::Failed { reason },
        };
        self.publish();
    }

    /// Starts a new game without waiting for the server.
    ///
    /// Ignored while still joining; the first snapshot starts the game.
    #[instrument(skip(self))]
    pub fn restart(&mut self) {
        if self.status == GameStatus::Connecting {
            debug!("Restart before the server answered the join ignored");
            return;
        }
        info!(status = %self.status, "Restarting game");
        self.send(Outbound::Restart);
        self.commentary.clear();
        self.board = Board::new();
        self.status = GameStatus::InProgress;
        self.status_text = NEW_GAME_TEXT.to_string();
        self.pulse = None;
        self.last_error = None;
        self.publish();
    }

    /// Asks the agent a question after the game. Returns whether it was sent.
    #[instrument(skip(self, text))]
    pub fn post_game_query(&mut self, text: &str) -> bool {
        if !self.status.is_over() {
            debug!(status = %self.status, "Questions are only taken after the game");
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            debug!("Empty question ignored");
            return false;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        info!(request_id, "Sending post-game question");
        self.commentary
            .push(Message::new(Author::Human, text.to_string(), Some(request_id)));
        self.send(Outbound::PostGameQuery {
            text: text.to_string(),
            request_id,
        });
        self.publish();
        true
    }

    /// Routes a decoded inbound event to its handler.
    pub fn dispatch(&mut self, event: Inbound) {
        match event {
            Inbound::BoardSnapshot(board) => self.handle_authoritative_board(board),
            Inbound::OpponentMove(patch) => self.handle_opponent_move(patch),
            Inbound::ToolExecuted(report) => self.handle_tool_executed(report),
            Inbound::StatusText(text) => self.handle_status_text(text),
            Inbound::GameOver(outcome) => self.handle_game_over(outcome),
            Inbound::InvalidMove(reason) => self.handle_invalid_move(reason),
            Inbound::Commentary(note) => self.handle_commentary(note),
            Inbound::ServerError(message) => self.handle_server_error(message),
            Inbound::Connection(event) => self.handle_connection(event),
        }
    }

    fn send(&self, event: Outbound) {
        if let Err(e) = self.sink.emit(&event) {
            warn!(error = %e, ?event, "Emit failed; the next snapshot will resync");
        }
    }

    fn publish(&self) {
        let view = ViewState::build(
            &self.board,
            self.status,
            &self.status_text,
            self.pulse,
            &self.commentary,
            &self.connectivity,
            self.last_error.as_deref(),
        );
        self.view_tx.send_replace(view);
    }
}
