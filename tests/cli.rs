use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn accmgr(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("accmgr").unwrap();
    cmd.env("ACCMGR_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("ACCMGR_ACCOUNT_TYPE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("client"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_get_shows_defaults() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["config", "get", "refresh-policy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Refresh policy: lazy"));
}

#[test]
fn test_config_set_persists() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["config", "set", "refresh-timeout", "12"])
        .assert()
        .success();

    accmgr(&dir)
        .args(["config", "get", "refresh-timeout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12s"));

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("refresh_timeout_secs = 12"));
}

#[test]
fn test_config_remove_restores_default() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["config", "set", "account-type", "com.example.other"])
        .assert()
        .success();
    accmgr(&dir)
        .args(["config", "remove", "account-type"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accmgr.oauth"));
}

#[test]
fn test_invalid_config_value_fails() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["config", "set", "refresh-policy", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid refresh policy"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["config", "get", "editor-theme"])
        .assert()
        .failure();
}

#[test]
fn test_remove_name_and_all_conflict() {
    let dir = TempDir::new().unwrap();
    accmgr(&dir)
        .args(["accounts", "remove", "--name", "alice", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_zero_refresh_timeout_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "refresh_timeout_secs = 0\n").unwrap();
    accmgr(&dir)
        .args(["config", "get", "refresh-timeout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refresh_timeout_secs must be at least 1 second"));
}
