//! JSON payload shapes exchanged with the game server.
//!
//! The server has shipped several payload layouts over time (flat and grid
//! boards, `{row, col}` and `{position}` moves, structured and legacy
//! game-over reports). Decoding accepts all of them; encoding follows the
//! configured [`WireOptions`].

use crate::error::SyncError;
use derive_getters::Getters;
use derive_new::new;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use versus_board::{Board, CELLS, Cell, Coord, Outcome, SIDE};

/// A mark as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Mark {
    /// Cross.
    X,
    /// Nought.
    O,
}

impl Mark {
    /// The other mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// How moves are encoded in outbound requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveFormat {
    /// `{"row": r, "col": c}`
    #[default]
    RowCol,
    /// `{"position": 0-8}`
    Position,
}

/// Field carrying the question text in post-game queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryField {
    /// `{"text": ..., "request_id": n}`
    #[default]
    Text,
    /// `{"query": ..., "request_id": n}`
    Query,
}

/// Wire-level options shared by every encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct WireOptions {
    /// Mark played by the local human.
    human_mark: Mark,
    /// Outbound move encoding.
    move_format: MoveFormat,
    /// Outbound post-game query encoding.
    query_field: QueryField,
}

impl Default for WireOptions {
    fn default() -> Self {
        Self {
            human_mark: Mark::X,
            move_format: MoveFormat::RowCol,
            query_field: QueryField::Text,
        }
    }
}

impl WireOptions {
    /// Maps a textual cell token to a [`Cell`].
    ///
    /// Accepts the two marks, side names (`human`, `ai`, `agent`) and the
    /// empty encodings (`""`, `" "`, `"empty"`).
    #[instrument(skip(self))]
    pub fn cell_from_token(&self, token: &str) -> Result<Cell, SyncError> {
        let token = token.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("empty") {
            return Ok(Cell::Empty);
        }
        let mark = match token {
            "X" | "x" => Some(Mark::X),
            "O" | "o" => Some(Mark::O),
            _ => None,
        };
        if let Some(mark) = mark {
            return Ok(if mark == self.human_mark {
                Cell::Human
            } else {
                Cell::Agent
            });
        }
        match token.to_ascii_lowercase().as_str() {
            "human" | "self" | "player" => Ok(Cell::Human),
            "ai" | "agent" | "opponent" => Ok(Cell::Agent),
            _ => Err(SyncError::decode(format!("unknown cell token {:?}", token))),
        }
    }

    /// Maps an optional token, treating `None` as empty.
    pub fn cell_from_option(&self, token: Option<&str>) -> Result<Cell, SyncError> {
        token.map_or(Ok(Cell::Empty), |t| self.cell_from_token(t))
    }

    /// Encodes a move request payload.
    pub fn encode_move(&self, coord: Coord) -> Value {
        match self.move_format {
            MoveFormat::RowCol => json!({ "row": coord.row(), "col": coord.col() }),
            MoveFormat::Position => json!({ "position": coord.index() }),
        }
    }

    /// Encodes a post-game query payload.
    pub fn encode_query(&self, text: &str, request_id: u64) -> Value {
        match self.query_field {
            QueryField::Text => json!({ "text": text, "request_id": request_id }),
            QueryField::Query => json!({ "query": text, "request_id": request_id }),
        }
    }
}

/// Board payload in any layout the server has used.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoardWire {
    Flat(Vec<Option<String>>),
    Grid(Vec<Vec<Option<String>>>),
    Wrapped {
        #[serde(alias = "board_state")]
        board: Box<BoardWire>,
    },
}

impl BoardWire {
    fn into_board(self, wire: &WireOptions) -> Result<Board, SyncError> {
        let tokens: Vec<Option<String>> = match self {
            BoardWire::Flat(cells) => cells,
            BoardWire::Grid(rows) => {
                if rows.len() != SIDE || rows.iter().any(|r| r.len() != SIDE) {
                    return Err(SyncError::decode("grid board must be 3x3"));
                }
                rows.into_iter().flatten().collect()
            }
            BoardWire::Wrapped { board } => return board.into_board(wire),
        };
        if tokens.len() != CELLS {
            return Err(SyncError::decode(format!(
                "flat board must have {} cells, got {}",
                CELLS,
                tokens.len()
            )));
        }
        let mut cells = [Cell::Empty; CELLS];
        for (slot, token) in cells.iter_mut().zip(tokens.iter()) {
            *slot = wire.cell_from_option(token.as_deref())?;
        }
        Ok(Board::from_cells(cells))
    }
}

/// Decodes a full board snapshot.
#[instrument(skip(value, wire))]
pub fn decode_board(value: &Value, wire: &WireOptions) -> Result<Board, SyncError> {
    let parsed: BoardWire = serde_json::from_value(value.clone())
        .map_err(|e| SyncError::decode(format!("unrecognised board payload: {}", e)))?;
    parsed.into_board(wire)
}

/// A single-cell update pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct CellPatch {
    /// Cell being updated.
    coord: Coord,
    /// New contents.
    cell: Cell,
    /// Whether the surface should flash the cell.
    pulse: bool,
}

#[derive(Debug, Deserialize)]
struct PatchWire {
    row: Option<usize>,
    col: Option<usize>,
    position: Option<usize>,
    #[serde(alias = "player", alias = "mark")]
    value: Option<String>,
    #[serde(default = "default_pulse")]
    pulse: bool,
}

fn default_pulse() -> bool {
    true
}

/// Decodes an incremental move event.
///
/// A missing `value` means the opponent placed the piece.
#[instrument(skip(value, wire))]
pub fn decode_patch(value: &Value, wire: &WireOptions) -> Result<CellPatch, SyncError> {
    let patch: PatchWire = serde_json::from_value(value.clone())?;
    let coord = match (patch.row, patch.col, patch.position) {
        (Some(row), Some(col), _) => Coord::new(row, col),
        (_, _, Some(position)) => Coord::from_index(position),
        _ => return Err(SyncError::decode("move event has neither row/col nor position")),
    }
    .ok_or_else(|| SyncError::decode("move event coordinate out of range"))?;
    let cell = match patch.value.as_deref() {
        Some(token) => wire.cell_from_token(token)?,
        None => Cell::Agent,
    };
    debug!(?coord, ?cell, "Decoded cell patch");
    Ok(CellPatch::new(coord, cell, patch.pulse))
}

/// Result of the agent executing a board tool.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct ToolReport {
    /// Board after the tool ran, when included.
    board: Option<Board>,
    /// Status text to show, when included.
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolWire {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "board")]
    board_state: Option<Value>,
}

/// Decodes a tool-executed event.
#[instrument(skip(value, wire))]
pub fn decode_tool_report(value: &Value, wire: &WireOptions) -> Result<ToolReport, SyncError> {
    let report: ToolWire = serde_json::from_value(value.clone())?;
    let board = match report.board_state {
        Some(Value::Null) | None => None,
        Some(board) => Some(decode_board(&board, wire)?),
    };
    let message = report.message.filter(|m| !m.trim().is_empty());
    Ok(ToolReport::new(board, message))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GameOverWire {
    Legacy(String),
    Report {
        #[serde(default)]
        winner: Option<String>,
        #[serde(default, alias = "isTie")]
        is_tie: bool,
    },
}

/// Decodes a game-over event into an outcome.
///
/// A report that is neither a tie nor won by the human counts as an agent
/// win, including a missing winner.
#[instrument(skip(value, wire))]
pub fn decode_game_over(value: &Value, wire: &WireOptions) -> Result<Outcome, SyncError> {
    let parsed: GameOverWire = serde_json::from_value(value.clone())?;
    match parsed {
        GameOverWire::Legacy(result) => match result.trim() {
            "Tie" => Ok(Outcome::Tie),
            "Human wins" => Ok(Outcome::HumanWin),
            "AI wins" => Ok(Outcome::AgentWin),
            other => Err(SyncError::decode(format!("unknown game result {:?}", other))),
        },
        GameOverWire::Report { is_tie: true, .. } => Ok(Outcome::Tie),
        GameOverWire::Report { winner, .. } => {
            match wire.cell_from_option(winner.as_deref())? {
                Cell::Human => Ok(Outcome::HumanWin),
                Cell::Agent | Cell::Empty => Ok(Outcome::AgentWin),
            }
        }
    }
}

/// Free text from the server, with an optional reply tag.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct TextNote {
    /// The text.
    text: String,
    /// Request id of the query this answers, when the server echoes one.
    in_reply_to: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextWire {
    Plain(String),
    Object {
        #[serde(alias = "message", alias = "reason", alias = "query")]
        text: String,
        #[serde(default, alias = "request_id")]
        in_reply_to: Option<u64>,
    },
}

/// Decodes any text-bearing payload (`"..."`, `{text}`, `{message}`, `{reason}`).
#[instrument(skip(value))]
pub fn decode_text(value: &Value) -> Result<TextNote, SyncError> {
    let parsed: TextWire = serde_json::from_value(value.clone())?;
    Ok(match parsed {
        TextWire::Plain(text) => TextNote::new(text, None),
        TextWire::Object { text, in_reply_to } => TextNote::new(text, in_reply_to),
    })
}
