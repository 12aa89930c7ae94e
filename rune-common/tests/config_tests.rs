//! Integration tests for session configuration resolution
//!
//! Tests that manipulate RUNE_CONFIG are marked with #[serial]
//! so they run sequentially, not in parallel.

use rune_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use rune_common::SessionConfig;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rune-env-config.toml");
    let cli = PathBuf::from("/tmp/rune-cli-config.toml");

    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rune-env-config.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/rune-env-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = SessionConfig::load(Some(&missing)).expect("missing file is not an error");
    assert_eq!(config, SessionConfig::default());
}

#[test]
#[serial]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "navigation_marker = \"shell\"").unwrap();
    writeln!(file, "[labels]").unwrap();
    writeln!(file, "no_transcript = \"instrumental\"").unwrap();

    let config = SessionConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.navigation_marker, "shell");
    assert_eq!(config.labels.no_transcript, "instrumental");
    assert_eq!(config.tracks_page, "tracks");
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fetch_timeout_secs = \"soon\"").unwrap();

    let result = SessionConfig::load(Some(file.path()));
    assert!(result.is_err());
}
