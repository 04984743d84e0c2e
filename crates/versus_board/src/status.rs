//! Game lifecycle status and final outcomes.

use serde::{Deserialize, Serialize};

/// How a finished game ended, from the local player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Outcome {
    /// The local player won.
    HumanWin,
    /// The agent won.
    AgentWin,
    /// Nobody won.
    Tie,
}

impl Outcome {
    /// User-facing result line.
    pub fn result_message(self) -> &'static str {
        match self {
            Outcome::Tie => "It's a tie! Want a rematch?",
            Outcome::HumanWin => "You won!",
            Outcome::AgentWin => "AI wins! Better luck next time.",
        }
    }
}

/// Lifecycle of the client-side view of a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum GameStatus {
    /// Waiting for the server to acknowledge the join.
    #[default]
    #[display("Connecting")]
    Connecting,
    /// Game running and the local player may act when it is their turn.
    #[display("In progress")]
    InProgress,
    /// Game running and the agent is to move.
    #[display("Awaiting opponent")]
    AwaitingOpponent,
    /// Game finished.
    #[display("Over ({_0})")]
    Over(Outcome),
}

impl GameStatus {
    /// True while a game is being played.
    pub fn is_live(self) -> bool {
        matches!(self, GameStatus::InProgress | GameStatus::AwaitingOpponent)
    }

    /// True once a game-over event has been applied.
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Over(_))
    }

    /// The outcome, when the game has ended.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            GameStatus::Over(outcome) => Some(outcome),
            _ => None,
        }
    }
}
