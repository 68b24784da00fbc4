//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory,
//! so every run starts from a fresh default config.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_quizwatch-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("QUIZWATCH_ENV")
        .env_remove("QUIZWATCH_TOKEN")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

fn events_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("events.json");
    std::fs::write(
        &path,
        r#"{
            "course-a": [
                {"_id": "early", "schedule": "2024-05-31T08:00:00+00:00", "quizLink": "https://forms.example/early"},
                {"_id": "other-day", "schedule": "2024-05-30T23:00:00+00:00"}
            ],
            "course-b": [
                {"_id": "late", "schedule": "2024-05-31T20:00:00+00:00", "quizLink": "https://forms.example/late"},
                {"_id": "broken", "schedule": "soon"}
            ]
        }"#,
    )
    .unwrap();
    path
}

#[test]
fn test_gate_last_day_with_subscription() {
    let home = TempDir::new().unwrap();
    let (out, _, code) = run_cli(
        home.path(),
        &["gate", "--date", "2024-05-31", "--subscription", "course-a"],
    );
    assert_eq!(code, 0);
    let v = json(&out);
    assert_eq!(v["active"], true);
    assert_eq!(v["last_day_of_month"], true);
}

#[test]
fn test_gate_closed_cases() {
    let home = TempDir::new().unwrap();

    let (out, _, _) = run_cli(
        home.path(),
        &["gate", "--date", "2024-05-30", "--subscription", "course-a"],
    );
    assert_eq!(json(&out)["active"], false);

    let (out, _, _) = run_cli(
        home.path(),
        &["gate", "--date", "2024-02-29", "--subscription", "course-a"],
    );
    let v = json(&out);
    assert_eq!(v["last_day_of_month"], true);
    assert_eq!(v["active"], false);

    let (out, _, _) = run_cli(home.path(), &["gate", "--date", "2024-05-31"]);
    let v = json(&out);
    assert_eq!(v["subscriptions"], 0);
    assert_eq!(v["active"], false);
}

#[test]
fn test_phase_active_and_pending() {
    let home = TempDir::new().unwrap();
    let (out, _, code) = run_cli(
        home.path(),
        &[
            "phase",
            "--scheduled",
            "2024-05-31T00:00:00+00:00",
            "--now",
            "2024-05-31T22:30:00+00:00",
        ],
    );
    assert_eq!(code, 0);
    let v = json(&out);
    assert_eq!(v["phase"], "active");
    assert_eq!(v["remaining_secs"], 1800);
    assert_eq!(v["remaining"], "00:30:00");

    let (out, _, _) = run_cli(
        home.path(),
        &[
            "phase",
            "--scheduled",
            "2024-05-31T00:00:00+00:00",
            "--now",
            "2024-05-31T21:00:00+00:00",
        ],
    );
    let v = json(&out);
    assert_eq!(v["phase"], "pending");
    assert_eq!(v["remaining"], "01:00:00");
}

#[test]
fn test_phase_closed_after_window() {
    let home = TempDir::new().unwrap();
    let (out, _, _) = run_cli(
        home.path(),
        &[
            "phase",
            "--scheduled",
            "2024-05-31T00:00:00+00:00",
            "--now",
            "2024-05-31T23:00:00+00:00",
        ],
    );
    let v = json(&out);
    assert_eq!(v["phase"], "closed");
    assert_eq!(v["remaining_secs"], 0);
}

#[test]
fn test_phase_rejects_bad_timestamp() {
    let home = TempDir::new().unwrap();
    let (_, err, code) = run_cli(home.path(), &["phase", "--scheduled", "whenever"]);
    assert_eq!(code, 1);
    assert!(err.contains("error:"));
}

#[test]
fn test_select_picks_latest_same_day_event() {
    let home = TempDir::new().unwrap();
    let file = events_file(home.path());
    let (out, _, code) = run_cli(
        home.path(),
        &[
            "select",
            "--events",
            file.to_str().unwrap(),
            "--date",
            "2024-05-31",
            "--offset",
            "+00:00",
        ],
    );
    assert_eq!(code, 0);
    let v = json(&out);
    assert_eq!(v["selected"]["event"]["id"], "late");
    assert_eq!(v["failures"].as_array().unwrap().len(), 0);
}

#[test]
fn test_select_nothing_on_other_days() {
    let home = TempDir::new().unwrap();
    let file = events_file(home.path());
    let (out, _, code) = run_cli(
        home.path(),
        &[
            "select",
            "--events",
            file.to_str().unwrap(),
            "--date",
            "2024-06-30",
            "--offset",
            "+00:00",
        ],
    );
    assert_eq!(code, 0);
    assert!(json(&out)["selected"].is_null());
}

#[test]
fn test_watch_once_reports_counting() {
    let home = TempDir::new().unwrap();
    let file = events_file(home.path());
    let (out, _, code) = run_cli(
        home.path(),
        &[
            "watch",
            "--once",
            "--events",
            file.to_str().unwrap(),
            "--now",
            "2024-05-31T22:30:00+00:00",
        ],
    );
    assert_eq!(code, 0);
    let lines: Vec<Value> = out.lines().map(json).collect();
    assert!(lines
        .iter()
        .any(|l| l["type"] == "EventSelected" && l["event_id"] == "late"));
    let snapshot = lines.last().unwrap();
    assert_eq!(snapshot["state"], "counting");
    assert_eq!(snapshot["phase"], "active");
}

#[test]
fn test_watch_once_idle_off_day() {
    let home = TempDir::new().unwrap();
    let file = events_file(home.path());
    let (out, _, code) = run_cli(
        home.path(),
        &[
            "watch",
            "--once",
            "--events",
            file.to_str().unwrap(),
            "--now",
            "2024-05-15T22:30:00+00:00",
        ],
    );
    assert_eq!(code, 0);
    let snapshot = json(out.lines().last().unwrap());
    assert_eq!(snapshot["state"], "idle");
    assert!(snapshot["event"].is_null());
}

#[test]
fn test_config_roundtrip() {
    let home = TempDir::new().unwrap();

    let (out, _, code) = run_cli(home.path(), &["config", "get", "policy.open_at"]);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "22:00");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "policy.close_at", "23:30"]);
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(home.path(), &["config", "get", "policy.close_at"]);
    assert_eq!(out.trim(), "23:30");

    let (out, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert_eq!(json(&out)["cadence"]["slow_poll_secs"], 3600);

    let (out, _, _) = run_cli(home.path(), &["config", "path"]);
    assert!(out.trim().ends_with("config.toml"));

    let (_, _, code) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(home.path(), &["config", "get", "policy.close_at"]);
    assert_eq!(out.trim(), "23:00");
}

#[test]
fn test_config_rejects_invalid_values() {
    let home = TempDir::new().unwrap();
    let (_, err, code) = run_cli(home.path(), &["config", "set", "policy.close_at", "21:00"]);
    assert_eq!(code, 1);
    assert!(err.contains("error:"));

    let (_, err, code) = run_cli(home.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
    assert!(err.contains("unknown key"));
}

#[test]
fn test_configured_subscriptions_feed_the_gate() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(
        home.path(),
        &["config", "set", "subscriptions", "course-a,course-b"],
    );
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(home.path(), &["gate", "--date", "2024-05-31"]);
    let v = json(&out);
    assert_eq!(v["subscriptions"], 2);
    assert_eq!(v["active"], true);
}
