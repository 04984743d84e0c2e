//! Board coordinates with a fixed row-major index mapping.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Side length of the board.
pub const SIDE: usize = 3;

/// Number of cells on the board.
pub const CELLS: usize = SIDE * SIDE;

/// A cell coordinate on the 3x3 board.
///
/// Rows and columns are zero-based. The flat index is `row * 3 + col`,
/// matching the flat board payloads the server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawCoord")]
pub struct Coord {
    row: u8,
    col: u8,
}

/// A row or column outside 0..=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("coordinate ({row}, {col}) is off the board")]
pub struct OffBoard {
    /// Requested row.
    pub row: usize,
    /// Requested column.
    pub col: usize,
}

#[derive(Deserialize)]
struct RawCoord {
    row: usize,
    col: usize,
}

impl TryFrom<RawCoord> for Coord {
    type Error = OffBoard;

    fn try_from(raw: RawCoord) -> Result<Self, Self::Error> {
        Coord::new(raw.row, raw.col).ok_or(OffBoard {
            row: raw.row,
            col: raw.col,
        })
    }
}

impl Coord {
    /// All nine coordinates in row-major order.
    pub const ALL: [Coord; CELLS] = [
        Coord { row: 0, col: 0 },
        Coord { row: 0, col: 1 },
        Coord { row: 0, col: 2 },
        Coord { row: 1, col: 0 },
        Coord { row: 1, col: 1 },
        Coord { row: 1, col: 2 },
        Coord { row: 2, col: 0 },
        Coord { row: 2, col: 1 },
        Coord { row: 2, col: 2 },
    ];

    /// Creates a coordinate, returning `None` when either axis is outside 0..=2.
    #[instrument]
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < SIDE && col < SIDE {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Creates a coordinate from a flat board index (0-8).
    #[instrument]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Flat row-major index (0-8).
    pub fn index(self) -> usize {
        self.row as usize * SIDE + self.col as usize
    }

    /// Zero-based row.
    pub fn row(self) -> usize {
        self.row as usize
    }

    /// Zero-based column.
    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Human-readable label for this cell.
    pub fn label(self) -> &'static str {
        const LABELS: [&str; CELLS] = [
            "Top-left",
            "Top-center",
            "Top-right",
            "Middle-left",
            "Center",
            "Middle-right",
            "Bottom-left",
            "Bottom-center",
            "Bottom-right",
        ];
        LABELS[self.index()]
    }

    /// Parses a keypad digit (1-9) into a coordinate.
    pub fn from_keypad(digit: char) -> Option<Self> {
        let n = digit.to_digit(10)? as usize;
        n.checked_sub(1).and_then(Self::from_index)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.label(), self.row, self.col)
    }
}
