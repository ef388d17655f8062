use std::fs;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn valid_config_json() -> &'static str {
    r#"
{
  "version": 1,
  "default_time": "10:00",
  "custom_time": "07:45",
  "mode": "custom",
  "audio": "anthem.mp3",
  "retry_delay_ms": 1000,
  "repeat": { "delay_ms": 500, "interval_ms": 100 },
  "notification": { "permission": "denied" }
}
"#
}

#[test]
fn diagnostics_succeeds_with_valid_config() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("schedule.json");
    fs::write(&config, valid_config_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--config")
        .arg(config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Active target: 07:45"))
        .stdout(predicate::str::contains("Notification permission: denied"));
}

#[test]
fn diagnostics_uses_defaults_without_config() {
    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--start-at")
        .arg("09:59:00")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active target: 10:00"))
        .stdout(predicate::str::contains("Seconds until trigger: 60"))
        .stdout(predicate::str::contains("Clock source: OFFSET_REHEARSAL"));
}

#[test]
fn malformed_json_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("schedule.json");
    fs::write(&config, "{ not-valid-json ").expect("write invalid json");

    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--config")
        .arg(config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn unsupported_version_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("schedule.json");
    fs::write(&config, r#"{ "version": 3 }"#).expect("write json");

    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--config")
        .arg(config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported config version 3"));
}

#[test]
fn cli_flags_override_config_file() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("schedule.json");
    fs::write(&config, valid_config_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--config")
        .arg(config)
        .arg("--time")
        .arg("21:05")
        .arg("--audio")
        .arg("other.ogg")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active target: 21:05"))
        .stdout(predicate::str::contains("Audio file: other.ogg (missing)"));
}

#[test]
fn invalid_time_flag_is_rejected() {
    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--time")
        .arg("7h30")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected HH:MM"));
}

#[cfg(not(feature = "rodio"))]
#[test]
fn rodio_player_requires_feature() {
    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--diagnostics")
        .arg("--player")
        .arg("rodio")
        .assert()
        .failure()
        .stderr(predicate::str::contains("`rodio` feature"));
}

#[test]
fn console_session_reports_status_and_quits() {
    let dir = tempdir().expect("tempdir");
    let audio = dir.path().join("missing.mp3");

    let mut cmd = cargo_bin_cmd!("autoplay");
    cmd.arg("--start-at")
        .arg("08:00:00")
        .arg("--mode")
        .arg("custom")
        .arg("--time")
        .arg("09:55")
        .arg("--audio")
        .arg(audio)
        .timeout(Duration::from_secs(20))
        .write_stdin("mode default\nstatus --json\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seconds_until_trigger\""));
}
