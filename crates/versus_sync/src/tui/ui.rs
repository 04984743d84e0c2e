//! Stateless rendering of the published view.

use super::app::{App, Focus};
use crate::commentary::Author;
use crate::view::{Connectivity, ViewState};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use versus_board::{Cell, Coord, GameStatus, SIDE};

/// Draws the whole screen.
pub fn draw(frame: &mut Frame, view: &ViewState, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(13), // Board
            Constraint::Length(3), // Status
            Constraint::Min(4),    // Commentary
            Constraint::Length(3), // Question / help
        ])
        .split(frame.area());

    draw_title(frame, chunks[0], view);
    draw_board(frame, chunks[1], view, app);

    let status = Paragraph::new(status_line(view))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[2]);

    draw_commentary(frame, chunks[3], view);
    draw_footer(frame, chunks[4], view, app);
}

fn draw_title(frame: &mut Frame, area: Rect, view: &ViewState) {
    let (label, color) = match view.connectivity() {
        Connectivity::Connected { .. } => ("online", Color::Green),
        Connectivity::Disconnected => ("offline", Color::DarkGray),
        Connectivity::Failed { .. } => ("connection failed", Color::Red),
    };
    let title = Line::from(vec![
        Span::styled(
            "Versus - Tic Tac Toe ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("[{}]", label), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(title).alignment(Alignment::Center), area);
}

fn status_line(view: &ViewState) -> String {
    match view.status() {
        GameStatus::Over(_) => format!("{} Press 'r' for a rematch.", view.status_text()),
        _ => view.status_text().clone(),
    }
}

fn draw_board(frame: &mut Frame, area: Rect, view: &ViewState, app: &App) {
    let board_area = center_rect(area, 40, 11);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(board_area);

    for row in 0..SIDE {
        draw_row(frame, rows[row * 2], view, app, row);
        if row + 1 < SIDE {
            draw_separator(frame, rows[row * 2 + 1]);
        }
    }
}

fn draw_row(frame: &mut Frame, area: Rect, view: &ViewState, app: &App, row: usize) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12),
            Constraint::Length(1),
            Constraint::Length(12),
            Constraint::Length(1),
            Constraint::Length(12),
        ])
        .split(area);

    for col in 0..SIDE {
        if let Some(coord) = Coord::new(row, col) {
            draw_cell(frame, cols[col * 2], view, app, coord);
        }
        if col + 1 < SIDE {
            draw_separator_vertical(frame, cols[col * 2 + 1]);
        }
    }
}

fn draw_cell(frame: &mut Frame, area: Rect, view: &ViewState, app: &App, coord: Coord) {
    let human = app.human_mark();
    let (symbol, base_style) = match view.board().get(coord) {
        Cell::Empty => (
            format!("{}", coord.index() + 1),
            Style::default().fg(Color::DarkGray),
        ),
        Cell::Human => (
            human.to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
        Cell::Agent => (
            human.opponent().to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let style = if *view.pulse() == Some(coord) {
        base_style.add_modifier(Modifier::SLOW_BLINK | Modifier::REVERSED)
    } else if coord == app.cursor() && *view.input_enabled() && app.focus() == Focus::Board {
        base_style.bg(Color::White).fg(Color::Black)
    } else {
        base_style
    };

    let paragraph = Paragraph::new(vec![
        Line::default(),
        Line::from(Span::styled(format!(" {} ", symbol), style)),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn draw_separator(frame: &mut Frame, area: Rect) {
    let sep = Paragraph::new("─".repeat(area.width as usize)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, area);
}

fn draw_separator_vertical(frame: &mut Frame, area: Rect) {
    let sep = Paragraph::new(vec![Line::from("│"); area.height as usize])
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, area);
}

fn draw_commentary(frame: &mut Frame, area: Rect, view: &ViewState) {
    let lines: Vec<Line> = view
        .commentary()
        .iter()
        .map(|message| {
            let (who, color) = match message.author() {
                Author::Human => ("You", Color::Blue),
                Author::Agent => ("AI", Color::Red),
            };
            Line::from(vec![
                Span::styled(format!("{}: ", who), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(message.text().clone()),
            ])
        })
        .collect();

    // Keep the newest lines in view.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let paragraph = Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>())
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Commentary").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, view: &ViewState, app: &App) {
    let (text, style, title) = match app.focus() {
        Focus::Question => (
            format!("> {}_", app.question()),
            Style::default().fg(Color::White),
            "Ask the AI (Enter to send, Esc to cancel)",
        ),
        Focus::Board if view.accepts_questions() => (
            "1-9/arrows+Enter move, r rematch, ? ask the AI, q quit".to_string(),
            Style::default().fg(Color::DarkGray),
            "Keys",
        ),
        Focus::Board => (
            "1-9/arrows+Enter move, r restart, q quit".to_string(),
            Style::default().fg(Color::DarkGray),
            "Keys",
        ),
    };
    let footer = Paragraph::new(text)
        .style(style)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::CommentaryLog;
    use crate::wire::Mark;
    use ratatui::{Terminal, backend::TestBackend};
    use versus_board::{Board, Outcome};

    fn rendered(view: &ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 32)).unwrap();
        let app = App::new(Mark::X);
        terminal.draw(|f| draw(f, view, &app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn renders_marks_and_status() {
        let mut board = Board::new();
        board.set(Coord::new(0, 0).unwrap(), Cell::Human);
        board.set(Coord::new(1, 1).unwrap(), Cell::Agent);
        let view = ViewState::build(
            &board,
            GameStatus::Over(Outcome::HumanWin),
            "You won!",
            None,
            &CommentaryLog::new(),
            &Connectivity::Connected { sid: None },
            None,
        );
        let screen = rendered(&view);
        assert!(screen.contains("You won!"));
        assert!(screen.contains("online"));
        assert!(screen.contains('X'));
        assert!(screen.contains('O'));
        assert!(screen.contains("ask the AI"));
    }
}
