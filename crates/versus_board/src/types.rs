//! Core board types for the client-side view of a game.

use crate::coord::{CELLS, Coord};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Contents of a single board cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Placed by the local human player.
    Human,
    /// Placed by the server-hosted agent.
    Agent,
}

impl Cell {
    /// True for [`Cell::Empty`].
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Whose turn it is, inferred from piece counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum TurnOwner {
    /// The local player is to move.
    Human,
    /// The agent is to move.
    Agent,
}

/// The full 3x3 grid as seen by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Cells in row-major order (0-8).
    cells: [Cell; CELLS],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; CELLS],
        }
    }

    /// Builds a board from row-major cells.
    pub fn from_cells(cells: [Cell; CELLS]) -> Self {
        Self { cells }
    }

    /// Cell at the given coordinate.
    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[coord.index()]
    }

    /// Overwrites the cell at the given coordinate.
    pub fn set(&mut self, coord: Coord, cell: Cell) {
        self.cells[coord.index()] = cell;
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell; CELLS] {
        &self.cells
    }

    /// Number of cells holding `cell`.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    /// True when no piece has been placed.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// True when every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Coordinates of all empty cells.
    pub fn empty_coords(&self) -> Vec<Coord> {
        Coord::ALL
            .iter()
            .copied()
            .filter(|coord| self.get(*coord).is_empty())
            .collect()
    }

    /// Checks the alternation invariant: the human moves first, so the
    /// human piece count leads the agent count by zero or one.
    #[instrument(skip(self))]
    pub fn parity_ok(&self) -> bool {
        let human = self.count(Cell::Human);
        let agent = self.count(Cell::Agent);
        human == agent || human == agent + 1
    }

    /// Infers whose turn it is from piece counts.
    ///
    /// The side with fewer pieces is to move; ties go to the human, who
    /// always opens.
    pub fn turn_owner(&self) -> TurnOwner {
        if self.count(Cell::Human) > self.count(Cell::Agent) {
            TurnOwner::Agent
        } else {
            TurnOwner::Human
        }
    }

    /// Three in a row, if any. Display hint only; the server decides results.
    pub fn winner(&self) -> Option<Cell> {
        const LINES: [[usize; 3]; 8] = [
            [0, 1, 2],
            [3, 4, 5],
            [6, 7, 8],
            [0, 3, 6],
            [1, 4, 7],
            [2, 5, 8],
            [0, 4, 8],
            [2, 4, 6],
        ];

        LINES.iter().find_map(|[a, b, c]| {
            let first = self.cells[*a];
            (!first.is_empty() && first == self.cells[*b] && first == self.cells[*c]).then_some(first)
        })
    }

    /// Formats the board as text, numbering empty cells 1-9.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for coord in Coord::ALL {
            let symbol = match self.get(coord) {
                Cell::Empty => (coord.index() + 1).to_string(),
                Cell::Human => "X".to_string(),
                Cell::Agent => "O".to_string(),
            };
            result.push_str(&symbol);
            if coord.col() < 2 {
                result.push('|');
            } else if coord.row() < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: usize, col: usize) -> Coord {
        Coord::new(row, col).unwrap()
    }

    #[test]
    fn empty_board_is_humans_turn() {
        let board = Board::new();
        assert!(board.is_blank());
        assert!(board.parity_ok());
        assert_eq!(board.turn_owner(), TurnOwner::Human);
        assert_eq!(board.empty_coords().len(), 9);
    }

    #[test]
    fn turn_flips_after_human_piece() {
        let mut board = Board::new();
        board.set(at(0, 0), Cell::Human);
        assert_eq!(board.turn_owner(), TurnOwner::Agent);
        board.set(at(1, 1), Cell::Agent);
        assert_eq!(board.turn_owner(), TurnOwner::Human);
    }

    #[test]
    fn parity_violations_detected() {
        let mut board = Board::new();
        board.set(at(0, 0), Cell::Agent);
        assert!(!board.parity_ok());

        let mut board = Board::new();
        board.set(at(0, 0), Cell::Human);
        board.set(at(0, 1), Cell::Human);
        assert!(!board.parity_ok());
    }

    #[test]
    fn winner_on_diagonal() {
        let mut board = Board::new();
        for coord in [at(0, 2), at(1, 1), at(2, 0)] {
            board.set(coord, Cell::Agent);
        }
        assert_eq!(board.winner(), Some(Cell::Agent));
    }

    #[test]
    fn display_numbers_empty_cells() {
        let mut board = Board::new();
        board.set(at(1, 1), Cell::Human);
        assert_eq!(board.display(), "1|2|3\n-+-+-\n4|X|6\n-+-+-\n7|8|9");
    }
}
