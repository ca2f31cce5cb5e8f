//! Integration tests for the workout binary.
//!
//! These tests drive whole sessions through the CLI against a temporary
//! data directory: start, guided run, end, cancel, and CSV rollup.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PUSH_ROUTINE: &str = r#"
id = "push-a"
name = "Push A"

[[exercises]]
id = "bench"
name = "Bench Press"
equipment = "barbell"
sets = 2
reps = 8
weight = 60.0
superset = "a"

[[exercises]]
id = "row"
name = "Cable Row"
equipment = "cable"
sets = 2
reps = { min = 8, max = 12 }
weight = 40.0
superset = "a"

[[exercises]]
id = "pushup"
name = "Push-up"
equipment = "Bodyweight"
sets = 1
reps = 15
"#;

const MISSING_WEIGHT_ROUTINE: &str = r#"
name = "Broken"

[[exercises]]
id = "bench"
name = "Bench Press"
equipment = "barbell"
sets = 3
reps = 5
"#;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("workout"))
}

fn write_routine(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("routine.toml");
    fs::write(&path, contents).expect("Failed to write routine");
    path
}

fn start(data_dir: &Path, routine: &Path) {
    cli()
        .arg("start")
        .arg(routine)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session started"));
}

fn active_session(data_dir: &Path) -> serde_json::Value {
    let contents =
        fs::read_to_string(data_dir.join("active_session.json")).expect("No active session");
    serde_json::from_str(&contents).expect("Invalid session JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Guided strength workout sessions"));
}

#[test]
fn test_start_creates_active_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);

    start(&data_dir, &routine);

    let session = active_session(&data_dir);
    assert_eq!(session["routine_name"], "Push A");
    assert_eq!(session["exercises"].as_array().unwrap().len(), 3);
    assert_eq!(session["exercises"][0]["status"], "pending");
}

#[test]
fn test_second_start_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);

    start(&data_dir, &routine);

    cli()
        .arg("start")
        .arg(&routine)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already active"));
}

#[test]
fn test_status_without_session() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No active session"));
}

#[test]
fn test_status_lists_exercises() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains("0/3 done"));
}

#[test]
fn test_auto_finish_runs_whole_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("run")
        .arg("--auto-finish")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session complete"))
        .stdout(predicate::str::contains("Exercises: 3/3"))
        .stdout(predicate::str::contains("Sets: 5"));

    assert!(!data_dir.join("active_session.json").exists());

    let log = fs::read_to_string(data_dir.join("finished_sessions.wal")).unwrap();
    let finished: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert!(finished["ended_at"].is_string());
    assert_eq!(finished["exercises"][0]["sets"].as_array().unwrap().len(), 2);
    assert_eq!(finished["exercises"][1]["sets"][0]["reps"], 8);
}

#[test]
fn test_run_rejects_missing_weight() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), MISSING_WEIGHT_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("run")
        .arg("--auto-finish")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bench Press (weight)"));

    // Nothing was started
    let session = active_session(&data_dir);
    assert_eq!(session["exercises"][0]["status"], "pending");
}

#[test]
fn test_interactive_tap_and_finish() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .write_stdin("t 1\nf\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session saved"));

    let session = active_session(&data_dir);
    assert_eq!(session["exercises"][0]["status"], "completed");
    assert_eq!(session["exercises"][0]["sets"].as_array().unwrap().len(), 1);
    // Superset partner is next
    assert_eq!(session["exercises"][1]["status"], "in_progress");
}

#[test]
fn test_end_requires_force_when_incomplete() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("end")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    assert!(data_dir.join("active_session.json").exists());

    cli()
        .arg("end")
        .arg("--force")
        .arg("--notes")
        .arg("gym closing")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session complete"));

    assert!(!data_dir.join("active_session.json").exists());
    let log = fs::read_to_string(data_dir.join("finished_sessions.wal")).unwrap();
    assert!(log.contains("gym closing"));
}

#[test]
fn test_cancel_discards_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("cancel")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session cancelled"));

    assert!(!data_dir.join("active_session.json").exists());
    assert!(!data_dir.join("finished_sessions.wal").exists());
}

#[test]
fn test_rollup_without_sessions() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to roll up"));
}

#[test]
fn test_rollup_writes_sets_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("run")
        .arg("--auto-finish")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    cli()
        .arg("rollup")
        .arg("--cleanup")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 sessions"));

    let csv = fs::read_to_string(data_dir.join("sets.csv")).unwrap();
    // header plus one row per set
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.contains("Bench Press"));
    assert!(!data_dir.join("finished_sessions.wal").exists());
    assert!(!data_dir.join("finished_sessions.wal.processed").exists());
}

#[test]
fn test_rollup_skips_corrupt_log_lines() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let routine = write_routine(temp_dir.path(), PUSH_ROUTINE);
    start(&data_dir, &routine);

    cli()
        .arg("run")
        .arg("--auto-finish")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let log_path = data_dir.join("finished_sessions.wal");
    let mut log = fs::read_to_string(&log_path).unwrap();
    log.push_str("{ this is not json\n");
    fs::write(&log_path, log).unwrap();

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 sessions"));
}
