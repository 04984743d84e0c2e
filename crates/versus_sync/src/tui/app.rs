//! Terminal-side state: cursor, focus and the question being typed.

use super::input::move_cursor;
use crate::session::UserCommand;
use crate::view::ViewState;
use crate::wire::Mark;
use crossterm::event::KeyCode;
use tracing::debug;
use versus_board::Coord;

/// Which widget receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Arrow keys, digits and shortcuts act on the board.
    Board,
    /// Keys are typed into the post-game question line.
    Question,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    cursor: Coord,
    focus: Focus,
    question: String,
    human_mark: Mark,
}

impl App {
    /// Creates the application with the cursor in the center.
    pub fn new(human_mark: Mark) -> Self {
        Self {
            cursor: Coord::ALL[4],
            focus: Focus::Board,
            question: String::new(),
            human_mark,
        }
    }

    /// Highlighted cell.
    pub fn cursor(&self) -> Coord {
        self.cursor
    }

    /// Current focus.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Question typed so far.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Mark drawn for the human's pieces.
    pub fn human_mark(&self) -> Mark {
        self.human_mark
    }

    /// Maps a key press to a session command, updating local state.
    pub fn handle_key(&mut self, key: KeyCode, view: &ViewState) -> Option<UserCommand> {
        match self.focus {
            Focus::Board => self.board_key(key, view),
            Focus::Question => self.question_key(key, view),
        }
    }

    fn board_key(&mut self, key: KeyCode, view: &ViewState) -> Option<UserCommand> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => Some(UserCommand::Quit),
            KeyCode::Char('r') => Some(UserCommand::Restart),
            KeyCode::Char('?') | KeyCode::Tab if view.accepts_questions() => {
                debug!("Question line focused");
                self.focus = Focus::Question;
                None
            }
            KeyCode::Char(c) => {
                let coord = Coord::from_keypad(c)?;
                self.cursor = coord;
                Some(UserCommand::Move(coord))
            }
            KeyCode::Enter => Some(UserCommand::Move(self.cursor)),
            arrow => {
                self.cursor = move_cursor(self.cursor, arrow);
                None
            }
        }
    }

    fn question_key(&mut self, key: KeyCode, view: &ViewState) -> Option<UserCommand> {
        // A restart from elsewhere ends the question window.
        if !view.accepts_questions() {
            self.focus = Focus::Board;
            self.question.clear();
            return self.board_key(key, view);
        }
        match key {
            KeyCode::Esc | KeyCode::Tab => {
                self.focus = Focus::Board;
                None
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.question);
                if text.trim().is_empty() {
                    None
                } else {
                    Some(UserCommand::Ask(text))
                }
            }
            KeyCode::Backspace => {
                self.question.pop();
                None
            }
            KeyCode::Char(c) => {
                self.question.push(c);
                None
            }
            _ => None,
        }
    }
}
