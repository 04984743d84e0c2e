//! A live game session: one socket connection driving one controller.

use crate::backoff::Backoff;
use crate::config::SyncConfig;
use crate::controller::GameSyncController;
use crate::error::SyncError;
use crate::events::{ConnectionEvent, Inbound};
use crate::transport::{
    Dialer, Emitter, SocketClient, SocketEvent, Subscription, Transport, WebSocketDialer,
};
use crate::view::ViewState;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use versus_board::Coord;

/// What the user can ask the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Place a piece.
    Move(Coord),
    /// Start a new game.
    Restart,
    /// Ask the agent a post-game question.
    Ask(String),
    /// End the session.
    Quit,
}

/// Owns the socket client, its listener guards and the controller.
#[derive(Debug)]
pub struct Session {
    config: SyncConfig,
    dialer: Box<dyn Dialer>,
    client: SocketClient,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    subscriptions: Vec<Subscription>,
    controller: GameSyncController<Emitter>,
}

impl Session {
    /// Dials the configured server and joins a game.
    #[instrument(skip(config), fields(server_url = %config.server_url()))]
    pub async fn connect(config: SyncConfig) -> Result<Self, SyncError> {
        let dialer = websocket_dialer(&config);
        Self::connect_with(dialer, config).await
    }

    /// Dials through `dialer` and keeps it for reconnects.
    pub async fn connect_with(dialer: impl Dialer, config: SyncConfig) -> Result<Self, SyncError> {
        let transport = dialer.dial().await?;
        Ok(Self::attach(transport, config).with_dialer(dialer))
    }

    /// Joins a game over an already open transport.
    ///
    /// Reconnects dial the configured server over a WebSocket unless
    /// [`Session::with_dialer`] says otherwise.
    pub fn attach(transport: impl Transport, config: SyncConfig) -> Self {
        let (client, events) = SocketClient::start(transport, config.socket().clone());
        let subscriptions = subscribe_all(&client, &config);
        let emitter = client.emitter(config.events().clone(), *config.wire());
        let mut controller =
            GameSyncController::new(emitter).with_show_server_errors(*config.show_server_errors());
        controller.initialize();
        Self {
            dialer: Box::new(websocket_dialer(&config)),
            config,
            client,
            events,
            subscriptions,
            controller,
        }
    }

    /// Replaces the dialer used for reconnects.
    pub fn with_dialer(mut self, dialer: impl Dialer) -> Self {
        self.dialer = Box::new(dialer);
        self
    }

    /// The synchronizer driven by this session.
    pub fn controller(&self) -> &GameSyncController<Emitter> {
        &self.controller
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.controller.subscribe()
    }

    /// Runs until the user quits or reconnecting gives up.
    ///
    /// On exit every listener is deregistered and the socket is closed.
    #[instrument(skip_all)]
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<UserCommand>,
    ) -> Result<(), SyncError> {
        info!("Session started");
        let mut backoff = Backoff::new(*self.config.reconnect());

        let result = loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(UserCommand::Quit) | None => break Ok(()),
                    Some(command) => self.apply(command),
                },

                event = self.events.recv() => {
                    let lost = match event {
                        Some(SocketEvent::Event { name, payload }) => {
                            self.on_event(&name, payload.as_ref());
                            false
                        }
                        Some(SocketEvent::Connection(event)) => {
                            let lost = !matches!(event, ConnectionEvent::Connected { .. });
                            if !lost {
                                backoff.reset();
                            }
                            self.controller.handle_connection(event);
                            lost
                        }
                        None => true,
                    };
                    if lost {
                        match self.reconnect(&mut backoff, &mut commands).await {
                            Reconnect::Connected => {}
                            Reconnect::Quit => break Ok(()),
                            Reconnect::GaveUp => {
                                break Err(SyncError::transport("reconnect attempts exhausted"));
                            }
                        }
                    }
                }
            }
        };

        self.teardown().await;
        result
    }

    fn apply(&mut self, command: UserCommand) {
        debug!(?command, "User command");
        match command {
            UserCommand::Move(coord) => {
                self.controller.submit_move(coord.row(), coord.col());
            }
            UserCommand::Restart => self.controller.restart(),
            UserCommand::Ask(text) => {
                self.controller.post_game_query(&text);
            }
            UserCommand::Quit => {}
        }
    }

    fn on_event(&mut self, name: &str, payload: Option<&Value>) {
        match Inbound::decode(name, payload, self.config.events(), self.config.wire()) {
            Ok(Some(event)) => self.controller.dispatch(event),
            Ok(None) => {}
            Err(e) => warn!(name, error = %e, "Dropping undecodable event"),
        }
    }

    /// Waits out the backoff and dials again until connected.
    async fn reconnect(
        &mut self,
        backoff: &mut Backoff,
        commands: &mut mpsc::UnboundedReceiver<UserCommand>,
    ) -> Reconnect {
        self.subscriptions.clear();
        loop {
            let Some(delay) = backoff.next_delay() else {
                error!(attempts = backoff.attempt(), "Giving up on the server");
                return Reconnect::GaveUp;
            };
            info!(delay_ms = delay.as_millis() as u64, "Reconnecting");

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = commands.recv() => match command {
                        Some(UserCommand::Quit) | None => return Reconnect::Quit,
                        Some(command) => debug!(?command, "Offline; command dropped"),
                    },
                }
            }

            match self.dialer.dial().await {
                Ok(transport) => {
                    let (client, events) =
                        SocketClient::start(transport, self.config.socket().clone());
                    self.subscriptions = subscribe_all(&client, &self.config);
                    self.controller
                        .reattach(client.emitter(self.config.events().clone(), *self.config.wire()));
                    self.client = client;
                    self.events = events;
                    self.controller.initialize();
                    return Reconnect::Connected;
                }
                Err(e) => {
                    warn!(error = %e, "Reconnect failed");
                    self.controller.handle_connection(ConnectionEvent::ConnectError {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn teardown(mut self) {
        debug!(listeners = self.subscriptions.len(), "Tearing down session");
        self.subscriptions.clear();
        self.client.shutdown().await;
        info!("Session ended");
    }
}

enum Reconnect {
    Connected,
    Quit,
    GaveUp,
}

fn websocket_dialer(config: &SyncConfig) -> WebSocketDialer {
    WebSocketDialer::new(config.server_url().clone(), config.socket_path().clone())
}

fn subscribe_all(client: &SocketClient, config: &SyncConfig) -> Vec<Subscription> {
    config
        .events()
        .inbound()
        .into_iter()
        .map(|name| client.on(name))
        .collect()
}
