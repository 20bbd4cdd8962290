//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway data directory and check
//! the JSON it prints.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_idlevault-cli"))
        .args(args)
        .env("IDLEVAULT_DATA_DIR", data_dir)
        .env_remove("IDLEVAULT_USER_ID")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("stdout is JSON")
}

#[test]
fn test_missing_user_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["player", "show"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "stderr: {stderr}");
}

#[test]
fn test_player_show_creates_record() {
    let dir = tempfile::tempdir().unwrap();
    let record = run_json(dir.path(), &["--user", "u1", "--name", "Test User", "player", "show"]);
    assert_eq!(record["user_id"], "u1");
    assert_eq!(record["display_name"], "Test User");
    assert_eq!(record["balance"].as_f64(), Some(1000.0));
    assert_eq!(record["upgrades"]["gpu-miner"], 1);
}

#[test]
fn test_user_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_idlevault-cli"))
        .args(["player", "show"])
        .env("IDLEVAULT_DATA_DIR", dir.path())
        .env("IDLEVAULT_USER_ID", "env-user")
        .output()
        .unwrap();
    assert!(output.status.success());
    let record: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["user_id"], "env-user");
}

#[test]
fn test_referral_credits_referrer() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["--user", "r", "player", "show"]);
    let invitee = run_json(dir.path(), &["--user", "u2", "--referrer", "r", "player", "show"]);
    assert_eq!(invitee["balance"].as_f64(), Some(1100.0));
    assert_eq!(invitee["referred_by"], "r");

    let referrer = run_json(dir.path(), &["--user", "r", "player", "show"]);
    assert_eq!(referrer["balance"].as_f64(), Some(2000.0));
    assert_eq!(referrer["referral_count"], 1);
}

#[test]
fn test_self_referral_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let record = run_json(dir.path(), &["--user", "u1", "--referrer", "u1", "player", "show"]);
    assert_eq!(record["balance"].as_f64(), Some(1000.0));
    assert!(record["referred_by"].is_null());
}

#[test]
fn test_tap_spends_energy() {
    let dir = tempfile::tempdir().unwrap();
    let event = run_json(dir.path(), &["--user", "u1", "tap", "--count", "3"]);
    assert_eq!(event["type"], "Tapped");
    assert_eq!(event["taps"], 3);
    assert_eq!(event["balance"].as_f64(), Some(1003.0));

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "tap", "--count", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid amount"));
}

#[test]
fn test_upgrade_list_and_rejected_buy() {
    let dir = tempfile::tempdir().unwrap();
    let offers = run_json(dir.path(), &["--user", "u1", "upgrade", "list"]);
    let offers = offers.as_array().unwrap();
    assert_eq!(offers.len(), 6);

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "upgrade", "buy", "quantum-comp"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Insufficient balance"));

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "upgrade", "buy", "warp-drive"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown upgrade"));

    let record = run_json(dir.path(), &["--user", "u1", "player", "show"]);
    assert_eq!(record["balance"].as_f64(), Some(1000.0));
}

#[test]
fn test_daily_claim_once() {
    let dir = tempfile::tempdir().unwrap();
    let status = run_json(dir.path(), &["--user", "u1", "daily", "status"]);
    assert_eq!(status["claimable"], true);

    let event = run_json(dir.path(), &["--user", "u1", "daily", "claim"]);
    assert_eq!(event["reward"], 500);
    assert_eq!(event["streak"], 1);

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "daily", "claim"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not ready"));
}

#[test]
fn test_boost_activation() {
    let dir = tempfile::tempdir().unwrap();
    let event = run_json(dir.path(), &["--user", "u1", "boost", "activate", "turbo"]);
    assert_eq!(event["type"], "BoostActivated");
    assert_eq!(event["balance"].as_f64().map(|b| b < 1000.0), Some(true));

    let list = run_json(dir.path(), &["--user", "u1", "boost", "list"]);
    assert_eq!(list["active"].as_array().unwrap().len(), 1);

    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "boost", "activate", "turbo"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already active"));
}

#[test]
fn test_withdraw_request_and_pending() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(
        dir.path(),
        &[
            "--user", "u1", "withdraw", "request", "--amount", "1000", "--destination", "UQabc",
            "--network", "TON",
        ],
    );
    assert_eq!(out["request"]["status"], "pending");
    assert_eq!(out["event"]["balance"].as_f64(), Some(0.0));

    let pending = run_json(dir.path(), &["withdraw", "pending"]);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["user_id"], "u1");

    let (_, _, code) = run_cli(
        dir.path(),
        &[
            "--user", "u1", "withdraw", "request", "--amount", "1000", "--destination", "UQabc",
            "--network", "TON",
        ],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_leaderboard() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["--user", "a", "player", "show"]);
    run_json(dir.path(), &["--user", "b", "tap", "--count", "5"]);
    let board = run_json(dir.path(), &["leaderboard", "--limit", "1"]);
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["user_id"], "b");
    assert_eq!(board[0]["rank"], 1);
}

#[test]
fn test_config_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "economy.vault_capacity_hours", "2"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "economy.vault_capacity_hours"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "2.0");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "economy.vault_capacity_hours", "0"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "economy.nope"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "economy.vault_capacity_hours"]);
    assert_eq!(stdout.trim(), "4.0");
}

#[test]
fn test_watch_prints_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "session.tick_interval_ms", "10"]);
    assert_eq!(code, 0);

    let (stdout, stderr, code) = run_cli(dir.path(), &["--user", "u1", "watch", "--ticks", "3"]);
    assert_eq!(code, 0, "watch failed: {stderr}");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let snapshot: Value = serde_json::from_str(line).unwrap();
        assert_eq!(snapshot["user_id"], "u1");
        assert_eq!(snapshot["max_energy"], 1000);
    }
}
