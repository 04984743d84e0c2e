//! Read-only view state published to the rendering surface.

use crate::commentary::CommentaryLog;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use versus_board::{Board, Coord, GameStatus, TurnOwner};

/// Connection indicator, kept apart from game state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// Not connected (initial state and after a disconnect).
    #[default]
    Disconnected,
    /// Connected to the server.
    Connected {
        /// Server-assigned session id.
        sid: Option<String>,
    },
    /// The last connection attempt failed.
    Failed {
        /// Failure description.
        reason: String,
    },
}

impl Connectivity {
    /// True when connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Connectivity::Connected { .. })
    }
}

/// Snapshot of everything a surface needs to draw the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ViewState {
    /// Current board.
    board: Board,
    /// Presented status; a live game with the agent to move shows as
    /// [`GameStatus::AwaitingOpponent`].
    status: GameStatus,
    /// Status line text.
    status_text: String,
    /// Whose turn the board says it is.
    turn: Option<TurnOwner>,
    /// Whether clicking an empty cell would submit a move.
    input_enabled: bool,
    /// Cell to flash after an incremental update.
    pulse: Option<Coord>,
    /// Chat history.
    commentary: CommentaryLog,
    /// Connection indicator.
    connectivity: Connectivity,
    /// Most recent server-reported error, if shown.
    last_error: Option<String>,
}

impl ViewState {
    /// Builds a view from controller state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        board: &Board,
        status: GameStatus,
        status_text: &str,
        pulse: Option<Coord>,
        commentary: &CommentaryLog,
        connectivity: &Connectivity,
        last_error: Option<&str>,
    ) -> Self {
        let turn = board.turn_owner();
        let presented = match (status, turn) {
            (GameStatus::InProgress, TurnOwner::Agent) => GameStatus::AwaitingOpponent,
            (other, _) => other,
        };
        Self {
            board: board.clone(),
            status: presented,
            status_text: status_text.to_string(),
            turn: status.is_live().then_some(turn),
            input_enabled: status == GameStatus::InProgress && turn == TurnOwner::Human,
            pulse,
            commentary: commentary.clone(),
            connectivity: connectivity.clone(),
            last_error: last_error.map(str::to_string),
        }
    }

    /// True when a post-game question may be asked.
    pub fn accepts_questions(&self) -> bool {
        self.status.is_over()
    }
}
