//! Integration tests for the `kefctl` CLI binary.
//!
//! These cover argument parsing, help output, shell completions, config
//! handling and error reporting without a real speaker on the network.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `kefctl` binary with env isolation.
///
/// Clears all `KEF_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn kefctl_cmd() -> assert_cmd::Command {
    isolated_cmd(Path::new("/tmp/kefctl-cli-test-nonexistent"))
}

fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("kefctl");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("KEF_PROFILE")
        .env_remove("KEF_ADDRESS")
        .env_remove("KEF_OUTPUT")
        .env_remove("KEF_TIMEOUT")
        .env_remove("KEF_DEFAULT_PROFILE")
        .env_remove("KEF_DEFAULTS__OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = kefctl_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    kefctl_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("KEF")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("volume"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    kefctl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kefctl"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    kefctl_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    kefctl_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = kefctl_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_speaker() {
    let output = kefctl_cmd().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(4), "Expected not-found exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("No speaker configured"),
        "Expected missing-speaker error:\n{text}"
    );
}

#[test]
fn test_unknown_profile() {
    let output = kefctl_cmd()
        .args(["--profile", "kitchen", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("kitchen"));
}

#[test]
fn test_invalid_address() {
    let output = kefctl_cmd()
        .args(["--address", "http://", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage exit code");
    assert!(combined_output(&output).contains("address"));
}

#[test]
fn test_volume_requires_number() {
    kefctl_cmd()
        .args(["volume", "loud"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unreachable_speaker() {
    // Port 9 (discard) on localhost is closed on any sane test machine.
    let output = kefctl_cmd()
        .args(["--address", "127.0.0.1:9", "--timeout", "2", "status"])
        .output()
        .unwrap();
    let code = output.status.code();
    assert!(
        code == Some(7) || code == Some(8),
        "Expected connection or timeout exit code, got {code:?}:\n{}",
        combined_output(&output)
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    kefctl_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();

    isolated_cmd(home.path())
        .args(["config", "init", "--speaker", "192.168.1.20", "--name", "desk"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Configuration saved"));

    isolated_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.desk]")
                .and(predicate::str::contains("192.168.1.20"))
                .and(predicate::str::contains("default_profile = \"desk\"")),
        );

    isolated_cmd(home.path())
        .args(["config", "init", "--speaker", "192.168.1.21", "--name", "desk"])
        .assert()
        .failure()
        .code(6);
}

#[test]
fn test_config_show_json() {
    let home = tempfile::tempdir().unwrap();

    isolated_cmd(home.path())
        .args(["config", "init", "--speaker", "10.0.0.5"])
        .assert()
        .success();

    isolated_cmd(home.path())
        .args(["-o", "json-compact", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"address\":\"10.0.0.5\""));
}

#[test]
fn test_config_default_output_applies_without_flag() {
    let home = tempfile::tempdir().unwrap();

    isolated_cmd(home.path())
        .args(["config", "init", "--speaker", "10.0.0.5"])
        .assert()
        .success();

    isolated_cmd(home.path())
        .env("KEF_DEFAULTS__OUTPUT", "json-compact")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output\":\"json-compact\""));

    // The flag still wins over the configured default
    isolated_cmd(home.path())
        .env("KEF_DEFAULTS__OUTPUT", "json-compact")
        .args(["-o", "table", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("address = \"10.0.0.5\""));
}

#[test]
fn test_config_default_output_rejects_unknown_format() {
    let home = tempfile::tempdir().unwrap();

    isolated_cmd(home.path())
        .env("KEF_DEFAULTS__OUTPUT", "yaml")
        .args(["config", "show"])
        .assert()
        .failure()
        .code(2);
}
