//! Tests for loading and printing client configuration.

use std::io::Write;
use versus_sync::{Mark, MoveFormat, QueryField, SyncConfig, SyncErrorKind};

#[test]
fn loads_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
server_url = "https://games.example.com"
show_server_errors = false

[events]
board_snapshot = "BOARD_STATE_UPDATED"
move_request = "make_move"

[wire]
move_format = "position"
query_field = "query"

[socket]
namespace = "/tictactoe"
"#
    )
    .unwrap();

    let config = SyncConfig::from_file(file.path()).unwrap();

    assert_eq!(config.server_url(), "https://games.example.com");
    assert!(!*config.show_server_errors());
    assert_eq!(config.events().board_snapshot(), "BOARD_STATE_UPDATED");
    assert_eq!(config.events().move_request(), "make_move");
    assert_eq!(config.events().join(), "join_game");
    assert_eq!(*config.wire().move_format(), MoveFormat::Position);
    assert_eq!(*config.wire().query_field(), QueryField::Query);
    assert_eq!(*config.wire().human_mark(), Mark::X);
    assert_eq!(config.socket().namespace(), "/tictactoe");
    assert_eq!(config.socket_path(), "/socket.io/");
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SyncConfig::from_file(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err.kind, SyncErrorKind::Config(_)));
}

#[test]
fn printed_config_loads_back() {
    let config = SyncConfig::default()
        .with_server_url("http://10.0.0.5:8000")
        .with_show_server_errors(false);
    let text = config.to_toml().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("versus.toml");
    std::fs::write(&path, &text).unwrap();

    assert_eq!(SyncConfig::from_file(&path).unwrap(), config);
}
