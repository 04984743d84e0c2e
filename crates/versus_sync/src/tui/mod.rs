//! Terminal UI for Versus

mod app;
mod input;
mod ui;

use crate::config::SyncConfig;
use crate::session::{Session, UserCommand};
use crate::view::ViewState;
use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Connects to the configured server and runs the game until the user quits.
pub async fn run_tui(config: SyncConfig) -> Result<()> {
    // Log to a file so tracing output does not tear the screen.
    let log_file = std::fs::File::create(config.log_file())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();

    info!(server_url = %config.server_url(), "Starting Versus TUI");

    let mut app = App::new(*config.wire().human_mark());
    let session = Session::connect(config).await?;
    let mut view_rx = session.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(session.run(cmd_rx));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_loop(&mut terminal, &mut app, &mut view_rx, &cmd_tx, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // The session may already have stopped on its own.
    let _ = cmd_tx.send(UserCommand::Quit);
    drop(cmd_tx);
    match runner.await {
        Ok(Ok(())) => info!("Session closed"),
        Ok(Err(e)) => {
            error!(error = %e, "Session failed");
            eprintln!("Error: {}", e);
        }
        Err(e) => error!(error = %e, "Session task panicked"),
    }

    if let Err(err) = &res {
        error!(error = ?err, "UI loop error");
        eprintln!("Error: {:?}", err);
    }
    res
}

/// Draws the latest view and forwards key presses until quit.
#[instrument(skip_all)]
fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    view_rx: &mut watch::Receiver<ViewState>,
    cmd_tx: &mpsc::UnboundedSender<UserCommand>,
    runner: &JoinHandle<Result<(), crate::error::SyncError>>,
) -> Result<()> {
    loop {
        if runner.is_finished() {
            info!("Session ended; leaving UI");
            return Ok(());
        }

        let view = view_rx.borrow_and_update().clone();
        terminal.draw(|f| ui::draw(f, &view, app))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key.code, &view) {
            Some(UserCommand::Quit) => {
                info!("User quit");
                return Ok(());
            }
            Some(command) => {
                debug!(?command, "Forwarding command");
                if cmd_tx.send(command).is_err() {
                    return Ok(());
                }
            }
            None => {}
        }
    }
}
