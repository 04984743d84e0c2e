//! Client-side tic-tac-toe types.
//!
//! The board here is a *view* of a game whose rules live on a server. It
//! knows enough to infer whose turn it is from piece counts and to check
//! that the two sides alternate, and nothing more.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coord;
mod status;
mod types;

pub use coord::{CELLS, Coord, OffBoard, SIDE};
pub use status::{GameStatus, Outcome};
pub use types::{Board, Cell, TurnOwner};
