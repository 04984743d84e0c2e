//! Client configuration loaded from TOML with environment overrides.

use crate::backoff::BackoffPolicy;
use crate::error::SyncError;
use crate::events::EventNames;
use crate::transport::SocketOptions;
use crate::wire::WireOptions;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Environment variable that overrides [`SyncConfig::server_url`].
pub const SERVER_URL_ENV: &str = "VERSUS_SERVER_URL";

/// Everything the client needs to reach a game server.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct SyncConfig {
    /// Server base URL (`http`, `https`, `ws` or `wss`).
    #[setters(into)]
    server_url: String,
    /// Socket.IO endpoint path.
    #[setters(into)]
    socket_path: String,
    /// Connection options.
    socket: SocketOptions,
    /// Event name mapping.
    events: EventNames,
    /// Payload encoding options.
    wire: WireOptions,
    /// Reconnect policy.
    reconnect: BackoffPolicy,
    /// Show server error events in the status line.
    show_server_errors: bool,
    /// Log file written while the terminal UI owns the screen.
    log_file: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            socket_path: "/socket.io/".to_string(),
            socket: SocketOptions::default(),
            events: EventNames::default(),
            wire: WireOptions::default(),
            reconnect: BackoffPolicy::default(),
            show_server_errors: true,
            log_file: PathBuf::from("versus.log"),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SyncError::config(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(server_url = %config.server_url, "Config loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SyncError> {
        toml::from_str(content)
            .map_err(|e| SyncError::config(format!("Failed to parse config: {}", e)))
    }

    /// Loads `path` if given, otherwise starts from defaults, then applies
    /// environment overrides.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Applies `VERSUS_SERVER_URL` when it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                debug!(url = %url, "Server URL overridden from environment");
                self.with_server_url(url.trim())
            }
            _ => self,
        }
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, SyncError> {
        toml::to_string_pretty(self)
            .map_err(|e| SyncError::config(format!("Failed to serialize config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Mark;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SyncConfig::from_toml("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.events().board_snapshot(), "board_update");
    }

    #[test]
    fn partial_tables_merge_with_defaults() {
        let config = SyncConfig::from_toml(
            r#"
            server_url = "http://game.local:9000"

            [events]
            board_snapshot = "BOARD_STATE_UPDATED"

            [wire]
            human_mark = "O"

            [reconnect]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.server_url(), "http://game.local:9000");
        assert_eq!(config.events().board_snapshot(), "BOARD_STATE_UPDATED");
        assert_eq!(config.events().game_over(), "game_over");
        assert_eq!(*config.wire().human_mark(), Mark::O);
        assert_eq!(*config.reconnect().max_attempts(), Some(3));
        assert!(*config.reconnect().enabled());
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = SyncConfig::from_toml("server_url = [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
