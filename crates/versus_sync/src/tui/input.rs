//! Cursor movement for keyboard navigation.

use crossterm::event::KeyCode;
use versus_board::{Coord, SIDE};

/// Moves the cursor one cell with the arrow keys, stopping at the edges.
pub fn move_cursor(cursor: Coord, key: KeyCode) -> Coord {
    let (row, col) = (cursor.row(), cursor.col());
    let next = match key {
        KeyCode::Right if col + 1 < SIDE => Coord::new(row, col + 1),
        KeyCode::Left if col > 0 => Coord::new(row, col - 1),
        KeyCode::Down if row + 1 < SIDE => Coord::new(row + 1, col),
        KeyCode::Up if row > 0 => Coord::new(row - 1, col),
        _ => None,
    };
    next.unwrap_or(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_move_within_the_board() {
        let center = Coord::new(1, 1).unwrap();
        assert_eq!(move_cursor(center, KeyCode::Up), Coord::new(0, 1).unwrap());
        assert_eq!(move_cursor(center, KeyCode::Right), Coord::new(1, 2).unwrap());
    }

    #[test]
    fn edges_stop_the_cursor() {
        let corner = Coord::new(0, 0).unwrap();
        assert_eq!(move_cursor(corner, KeyCode::Up), corner);
        assert_eq!(move_cursor(corner, KeyCode::Left), corner);
        assert_eq!(move_cursor(corner, KeyCode::Char('x')), corner);
    }
}
