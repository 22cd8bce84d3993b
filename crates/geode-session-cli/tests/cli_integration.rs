//! CLI integration tests for the gsession command-line interface.
//!
//! These tests verify:
//! - Help text and argument parsing
//! - The demo lifecycle runs to expiration against an in-process region
//! - Frame files written by the demo decode back
//! - Config init/which/show against a temporary config directory

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the gsession binary, isolated to `config_dir`.
fn gsession(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gsession").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("GEODE_SESSION_CONFIG_DIR", config_dir.path())
        .current_dir(config_dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    gsession(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    gsession(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gsession"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    gsession(&dir).arg("replicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo and Decode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_demo_runs_to_expiration() {
    let dir = TempDir::new().unwrap();
    gsession(&dir)
        .args(["demo", "--interval", "1"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("created"))
        .stdout(predicate::str::contains("updated"))
        .stdout(predicate::str::contains("expired"))
        .stdout(predicate::str::contains("attributes now: cart, session.principal_name"));
}

#[test]
fn test_demo_rejects_non_positive_interval() {
    let dir = TempDir::new().unwrap();
    gsession(&dir)
        .args(["demo", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--interval"));
}

#[test]
fn test_demo_frame_decodes() {
    let dir = TempDir::new().unwrap();
    let frame = dir.path().join("session.bin");

    gsession(&dir)
        .args(["demo", "--interval", "1", "--principal", "alice", "--out"])
        .arg(&frame)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success();
    assert!(frame.is_file());

    gsession(&dir)
        .arg("decode")
        .arg(&frame)
        .assert()
        .success()
        .stdout(predicate::str::contains("0x9192ACE5"))
        .stdout(predicate::str::contains("cart"));

    let output = gsession(&dir)
        .args(["--json", "decode"])
        .arg(&frame)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "session");
    assert_eq!(value["attributes"]["cart"]["value"], 3);
    assert_eq!(value["attributes"]["session.principal_name"]["value"], "alice");
    assert!(value["attributes"].get("a").is_none());
}

#[test]
fn test_decode_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.bin");
    fs::write(&path, [0xde, 0xad]).unwrap();

    gsession(&dir).arg("decode").arg(&path).assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_which() {
    let dir = TempDir::new().unwrap();

    gsession(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(dir.path().join("config.toml").is_file());

    gsession(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 config file(s) loaded."));
}

#[test]
fn test_config_show_json_reflects_project_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("geode-session.toml"),
        "[region]\nname = \"ProjectRegion\"\n",
    )
    .unwrap();

    let output = gsession(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["region"]["name"], "ProjectRegion");
    assert_eq!(value["session"]["serializer"], "data-session");
}

#[test]
fn test_config_path_honours_config_dir() {
    let dir = TempDir::new().unwrap();
    gsession(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
