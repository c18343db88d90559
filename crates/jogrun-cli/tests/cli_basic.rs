//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with an isolated config directory and
//! verify its JSON output.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_dir: &std::path::Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_jogrun-cli"))
        .args(args)
        .env("JOGRUN_CONFIG_DIR", config_dir)
        .env_remove("JOGRUN_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(config_dir: &std::path::Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(config_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

/// Run a CLI command with `input` on stdin. Returns `None` if it is still
/// running after `timeout`.
fn run_with_stdin(
    config_dir: &std::path::Path,
    args: &[&str],
    input: &str,
    timeout: Duration,
) -> Option<(String, i32)> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jogrun-cli"))
        .args(args)
        .env("JOGRUN_CONFIG_DIR", config_dir)
        .env_remove("JOGRUN_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn CLI");

    let mut stdin = child.stdin.take().expect("stdin piped");
    stdin.write_all(input.as_bytes()).expect("Failed to write stdin");
    drop(stdin);

    let deadline = Instant::now() + timeout;
    while child.try_wait().expect("Failed to poll CLI").is_none() {
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    let output = child.wait_with_output().expect("Failed to collect output");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    Some((stdout, output.status.code().unwrap_or(-1)))
}

fn json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse JSON line"))
        .collect()
}

fn count(events: &[Value], kind: &str) -> usize {
    events.iter().filter(|e| e["type"] == kind).count()
}

#[test]
fn test_simulate_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(
        dir.path(),
        &["simulate", "--jog", "5", "--run", "3", "--intervals", "2"],
    );
    let events = json_lines(&out);

    assert_eq!(events[0]["type"], "workout_started");
    assert_eq!(events[0]["phase"], "jog");
    assert_eq!(count(&events, "phase_changed"), 3);
    assert_eq!(count(&events, "workout_completed"), 1);

    let last = events.last().unwrap();
    assert_eq!(last["type"], "state_snapshot");
    assert_eq!(last["status"], "completed");
    assert_eq!(last["remaining_secs"], 0);
}

#[test]
fn test_simulate_phase_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(
        dir.path(),
        &["simulate", "--jog", "5", "--run", "3", "--intervals", "2"],
    );
    let changes: Vec<(String, u64)> = json_lines(&out)
        .iter()
        .filter(|e| e["type"] == "phase_changed")
        .map(|e| (e["phase"].as_str().unwrap().to_string(), e["interval"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        changes,
        vec![
            ("run".to_string(), 1),
            ("jog".to_string(), 2),
            ("run".to_string(), 2)
        ]
    );
}

#[test]
fn test_simulate_limited_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(dir.path(), &["simulate", "--jog", "60", "--ticks", "3"]);
    let last = json_lines(&out).pop().unwrap();
    assert_eq!(last["status"], "running");
    assert_eq!(last["remaining_secs"], 57);
}

#[test]
fn test_simulate_countdown() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(
        dir.path(),
        &["simulate", "--jog", "2", "--run", "2", "--intervals", "1", "--countdown", "3"],
    );
    let events = json_lines(&out);
    let countdown: Vec<u64> = events
        .iter()
        .filter(|e| e["type"] == "countdown_tick")
        .map(|e| e["seconds_left"].as_u64().unwrap())
        .collect();
    assert_eq!(countdown, vec![3, 2, 1]);
    assert_eq!(events[3]["type"], "workout_started");
    assert_eq!(events.last().unwrap()["status"], "completed");
}

#[test]
fn test_simulate_detection_is_observational() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(
        dir.path(),
        &[
            "simulate", "--jog", "5", "--run", "3", "--intervals", "2", "--mode", "outdoor",
            "--reading", "1=4.0",
        ],
    );
    let events = json_lines(&out);
    let detected: Vec<&Value> = events
        .iter()
        .filter(|e| e["type"] == "phase_detected")
        .collect();
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0]["phase"], "run");
    assert_eq!(count(&events, "phase_changed"), 3);
}

#[test]
fn test_simulate_rejects_zero_intervals() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["simulate", "--intervals", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Interval count"), "stderr: {stderr}");
}

#[test]
fn test_classify_cadence() {
    let dir = tempfile::tempdir().unwrap();
    let out: Value = serde_json::from_str(&run_ok(dir.path(), &["classify", "176"])).unwrap();
    assert_eq!(out["phase"], "run");
    assert_eq!(out["threshold"], 170.0);

    let out: Value = serde_json::from_str(&run_ok(
        dir.path(),
        &["classify", "172", "--previous", "jog"],
    ))
    .unwrap();
    assert_eq!(out["phase"], "jog");
}

#[test]
fn test_classify_speed_with_hysteresis() {
    let dir = tempfile::tempdir().unwrap();
    let out: Value = serde_json::from_str(&run_ok(
        dir.path(),
        &["classify", "2.8", "--mode", "outdoor", "--previous", "run"],
    ))
    .unwrap();
    assert_eq!(out["phase"], "run");
}

#[test]
fn test_classify_requires_detection_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["classify", "170", "--mode", "off"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "workout.jog_secs"]).trim(), "60");
    assert!(dir.path().join("config.toml").exists());

    assert_eq!(run_ok(dir.path(), &["config", "set", "workout.jog_secs", "90"]).trim(), "ok");
    assert_eq!(run_ok(dir.path(), &["config", "get", "workout.jog_secs"]).trim(), "90");

    run_ok(dir.path(), &["config", "reset"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "workout.jog_secs"]).trim(), "60");
}

#[test]
fn test_config_set_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "workout.nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("workout.nope"));

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "workout.mode", "walk"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(dir.path(), &["config", "list"]);
    assert!(out.lines().any(|l| l == "workout.mode = off"));
    assert!(out.lines().any(|l| l == "detection.calibration_min_samples = 3"));

    let json: Value = serde_json::from_str(&run_ok(dir.path(), &["config", "list", "--json"])).unwrap();
    assert_eq!(json["workout"]["intervals"], 5);
}

#[test]
fn test_simulate_uses_configured_workout() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["config", "set", "workout.jog_secs", "2"]);
    run_ok(dir.path(), &["config", "set", "workout.run_secs", "1"]);
    run_ok(dir.path(), &["config", "set", "workout.intervals", "1"]);
    let events = json_lines(&run_ok(dir.path(), &["simulate"]));
    assert_eq!(events[0]["duration_secs"], 2);
    assert_eq!(events[0]["total_intervals"], 1);
    assert_eq!(events.last().unwrap()["status"], "completed");
}

#[test]
fn test_run_exits_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, code) = run_with_stdin(
        dir.path(),
        &["run", "--jog", "60", "--run", "30", "--intervals", "2", "--countdown", "0"],
        "stop\n",
        Duration::from_secs(10),
    )
    .expect("run did not exit after stop");
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    assert_eq!(events[0]["type"], "workout_started");
    assert_eq!(count(&events, "workout_stopped"), 1);
}

#[test]
fn test_run_exits_when_stdin_closes() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, code) = run_with_stdin(
        dir.path(),
        &["run", "--jog", "60", "--countdown", "0"],
        "",
        Duration::from_secs(10),
    )
    .expect("run did not exit on end of input");
    assert_eq!(code, 0);
    assert_eq!(json_lines(&stdout)[0]["type"], "workout_started");
}
