//! Tests for configuration loading and root folder resolution
//!
//! Env-var tests are serialized because process environment is global.

use sapphire_common::config::{resolve_root_folder, AiMode, Config, RootFolder};
use serial_test::serial;
use std::path::PathBuf;

fn clear_env() {
    for var in [
        "SAPPHIRE_ROOT",
        "PORT",
        "REMINDER_POLL_SECONDS",
        "EMAIL_FROM",
        "NOTIFY_EMAIL",
        "SMTP_HOST",
        "SMTP_PORT",
        "SMTP_USER",
        "SMTP_PASS",
        "ASSEMBLYAI_API_KEY",
        "AI_MODE",
        "MEETINGS_MOCK",
        "MAX_UPLOAD_SIZE_MB",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn cli_argument_takes_priority() {
    clear_env();
    std::env::set_var("SAPPHIRE_ROOT", "/tmp/from-env");

    let resolved = resolve_root_folder(Some("/tmp/from-cli"));
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

    clear_env();
}

#[test]
#[serial]
fn env_var_used_when_no_cli_argument() {
    clear_env();
    std::env::set_var("SAPPHIRE_ROOT", "/tmp/from-env");

    let resolved = resolve_root_folder(None);
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

    clear_env();
}

#[test]
#[serial]
fn fallback_is_sapphire_data_dir() {
    clear_env();

    let resolved = resolve_root_folder(None);
    assert!(resolved.ends_with("sapphire") || resolved.ends_with("sapphire_data"));
}

#[test]
#[serial]
fn defaults_when_config_file_missing() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().into());

    let config = Config::load(&root).unwrap();
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.reminders.poll_seconds, 60);
    assert_eq!(config.ai.mode, AiMode::Mock);
    assert_eq!(config.uploads.max_size_mb, 500);
    assert!(config.reminders.smtp.is_none());
}

#[test]
#[serial]
fn config_file_values_are_read() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().into());
    std::fs::write(
        root.config_path(),
        r#"
        [server]
        port = 8080

        [reminders]
        poll_seconds = 15
        from_address = "reminders@campus.edu"

        [reminders.smtp]
        host = "smtp.campus.edu"
        username = "mailer"

        [ai]
        mode = "mock"

        [uploads]
        max_size_mb = 50
        "#,
    )
    .unwrap();

    let config = Config::load(&root).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.reminders.poll_seconds, 15);
    assert_eq!(config.reminders.from_address, "reminders@campus.edu");
    let smtp = config.reminders.smtp.unwrap();
    assert_eq!(smtp.host, "smtp.campus.edu");
    assert_eq!(smtp.port, 587);
    assert_eq!(config.uploads.max_size_mb, 50);
}

#[test]
#[serial]
fn env_overrides_beat_config_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().into());
    std::fs::write(root.config_path(), "[server]\nport = 8080\n").unwrap();

    std::env::set_var("PORT", "9000");
    std::env::set_var("SMTP_HOST", "smtp.example.com");
    std::env::set_var("REMINDER_POLL_SECONDS", "5");

    let config = Config::load(&root).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.reminders.poll_seconds, 5);
    assert_eq!(config.reminders.smtp.unwrap().host, "smtp.example.com");

    clear_env();
}

#[test]
#[serial]
fn live_mode_without_api_key_falls_back_to_mock() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().into());
    std::fs::write(root.config_path(), "[ai]\nmode = \"live\"\n").unwrap();

    let config = Config::load(&root).unwrap();
    assert_eq!(config.ai.mode, AiMode::Mock);

    clear_env();
}

#[test]
#[serial]
fn meetings_mock_env_forces_mock_mode() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().into());

    std::env::set_var("ASSEMBLYAI_API_KEY", "key-123");
    std::env::set_var("AI_MODE", "live");
    std::env::set_var("MEETINGS_MOCK", "1");

    let config = Config::load(&root).unwrap();
    assert_eq!(config.ai.mode, AiMode::Mock);

    clear_env();
}
