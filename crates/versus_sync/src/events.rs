//! The named-event contract between the client and the game server.

use crate::error::SyncError;
use crate::wire::{
    self, CellPatch, TextNote, ToolReport, WireOptions,
};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use versus_board::{Board, Coord, Outcome};

/// Event names for every message in the contract.
///
/// The defaults are the canonical contract; each name can be remapped in
/// the configuration file to talk to servers using other names.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_", into)]
#[serde(default)]
pub struct EventNames {
    /// Outbound: start or attach to a game.
    join: String,
    /// Outbound: submit a human move.
    move_request: String,
    /// Outbound: start a new game.
    restart: String,
    /// Outbound: free-form question after the game ends.
    post_game_query: String,
    /// Inbound: full board snapshot.
    board_snapshot: String,
    /// Inbound: single-cell update.
    opponent_move: String,
    /// Inbound: the agent ran a board tool (snapshot and/or status text).
    tool_executed: String,
    /// Inbound: status line text.
    status_text: String,
    /// Inbound: game finished.
    game_over: String,
    /// Inbound: the server rejected a move.
    invalid_move: String,
    /// Inbound: agent commentary.
    commentary: String,
    /// Inbound: generic server-side error.
    server_error: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            join: "join_game".to_string(),
            move_request: "human_move".to_string(),
            restart: "restart_game".to_string(),
            post_game_query: "post_game_query".to_string(),
            board_snapshot: "board_update".to_string(),
            opponent_move: "opponent_move".to_string(),
            tool_executed: "ai_tool_executed".to_string(),
            status_text: "status_update".to_string(),
            game_over: "game_over".to_string(),
            invalid_move: "invalid_move".to_string(),
            commentary: "ai_message".to_string(),
            server_error: "error".to_string(),
        }
    }
}

impl EventNames {
    /// Every inbound event name, for listener registration.
    pub fn inbound(&self) -> Vec<String> {
        vec![
            self.board_snapshot.clone(),
            self.opponent_move.clone(),
            self.tool_executed.clone(),
            self.status_text.clone(),
            self.game_over.clone(),
            self.invalid_move.clone(),
            self.commentary.clone(),
            self.server_error.clone(),
        ]
    }
}

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Start or attach to a game.
    Join,
    /// Place a piece.
    Move(Coord),
    /// Start a new game.
    Restart,
    /// Ask the agent something after the game.
    PostGameQuery {
        /// Question text.
        text: String,
        /// Client-assigned id the server may echo on replies.
        request_id: u64,
    },
}

impl Outbound {
    /// Event name under the given mapping.
    pub fn name<'a>(&self, names: &'a EventNames) -> &'a str {
        match self {
            Outbound::Join => &names.join,
            Outbound::Move(_) => &names.move_request,
            Outbound::Restart => &names.restart,
            Outbound::PostGameQuery { .. } => &names.post_game_query,
        }
    }

    /// Event payload; `None` for events sent without data.
    pub fn payload(&self, wire: &WireOptions) -> Option<Value> {
        match self {
            Outbound::Join | Outbound::Restart => None,
            Outbound::Move(coord) => Some(wire.encode_move(*coord)),
            Outbound::PostGameQuery { text, request_id } => {
                Some(wire.encode_query(text, *request_id))
            }
        }
    }
}

/// Transport-level connection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Socket.IO namespace connected.
    Connected {
        /// Session id assigned by the server.
        sid: Option<String>,
    },
    /// Connection closed.
    Disconnected {
        /// Why, when known.
        reason: Option<String>,
    },
    /// Connection attempt or namespace connect refused.
    ConnectError {
        /// Server or transport message.
        reason: String,
    },
}

/// Messages the client receives, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Replace the board wholesale.
    BoardSnapshot(Board),
    /// Patch one cell.
    OpponentMove(CellPatch),
    /// Agent tool result.
    ToolExecuted(ToolReport),
    /// New status line.
    StatusText(String),
    /// Game finished.
    GameOver(Outcome),
    /// Server rejected a move.
    InvalidMove(String),
    /// Agent commentary.
    Commentary(TextNote),
    /// Generic server error.
    ServerError(String),
    /// Transport lifecycle.
    Connection(ConnectionEvent),
}

impl Inbound {
    /// Decodes a named event.
    ///
    /// Returns `Ok(None)` for names outside the contract.
    #[instrument(skip(payload, names, wire))]
    pub fn decode(
        name: &str,
        payload: Option<&Value>,
        names: &EventNames,
        wire: &WireOptions,
    ) -> Result<Option<Self>, SyncError> {
        let value = payload.unwrap_or(&Value::Null);
        let event = if name == names.board_snapshot {
            Inbound::BoardSnapshot(wire::decode_board(value, wire)?)
        } else if name == names.opponent_move {
            Inbound::OpponentMove(wire::decode_patch(value, wire)?)
        } else if name == names.tool_executed {
            Inbound::ToolExecuted(wire::decode_tool_report(value, wire)?)
        } else if name == names.status_text {
            Inbound::StatusText(wire::decode_text(value)?.text().clone())
        } else if name == names.game_over {
            Inbound::GameOver(wire::decode_game_over(value, wire)?)
        } else if name == names.invalid_move {
            Inbound::InvalidMove(wire::decode_text(value)?.text().clone())
        } else if name == names.commentary {
            Inbound::Commentary(wire::decode_text(value)?)
        } else if name == names.server_error {
            Inbound::ServerError(wire::decode_text(value)?.text().clone())
        } else {
            debug!(name, "Ignoring event outside the contract");
            return Ok(None);
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::QueryField;
    use serde_json::json;
    use versus_board::Cell;

    #[test]
    fn outbound_names_and_payloads() {
        let names = EventNames::default();
        let wire = WireOptions::default();
        let coord = Coord::new(0, 2).unwrap();

        assert_eq!(Outbound::Join.name(&names), "join_game");
        assert_eq!(Outbound::Join.payload(&wire), None);
        assert_eq!(Outbound::Move(coord).name(&names), "human_move");
        assert_eq!(
            Outbound::Move(coord).payload(&wire),
            Some(json!({ "row": 0, "col": 2 }))
        );
        let query = Outbound::PostGameQuery {
            text: "why?".to_string(),
            request_id: 7,
        };
        assert_eq!(query.payload(&wire), Some(json!({ "text": "why?", "request_id": 7 })));

        let wire = wire.with_query_field(QueryField::Query);
        assert_eq!(query.payload(&wire), Some(json!({ "query": "why?", "request_id": 7 })));
    }

    #[test]
    fn remapped_names_decode() {
        let names = EventNames::default().with_board_snapshot("BOARD_STATE_UPDATED");
        let wire = WireOptions::default();
        let payload = json!(["X", null, null, null, null, null, null, null, null]);

        let event = Inbound::decode("BOARD_STATE_UPDATED", Some(&payload), &names, &wire)
            .unwrap()
            .unwrap();
        match event {
            Inbound::BoardSnapshot(board) => assert_eq!(board.count(Cell::Human), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Inbound::decode("board_update", Some(&payload), &names, &wire).unwrap(), None);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let names = EventNames::default();
        let wire = WireOptions::default();
        assert!(Inbound::decode("game_over", None, &names, &wire).is_err());
        assert!(Inbound::decode("status_update", Some(&json!([1, 2])), &names, &wire).is_err());
    }

    #[test]
    fn inbound_names_cover_contract() {
        let names = EventNames::default();
        let inbound = names.inbound();
        assert_eq!(inbound.len(), 8);
        assert!(inbound.contains(&"ai_message".to_string()));
        assert!(!inbound.contains(&"join_game".to_string()));
    }
}
