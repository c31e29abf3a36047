//! CLI command integration tests.
//! Each test clears JOURNEY_CONFIG so only the flags under test apply.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn journey_cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("journey").unwrap();
    cmd.env_remove("JOURNEY_CONFIG");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("journey.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn simulate_prompt_completes() {
    journey_cmd()
        .args(["simulate", "the quick brown fox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status:     finished"))
        .stdout(predicate::str::contains("completed:  4/4"))
        .stdout(predicate::str::contains("generated:  0"))
        .stdout(predicate::str::contains("LM Head (Output)"));
}

#[test]
fn simulate_with_generation() {
    journey_cmd()
        .args(["simulate", "hello world", "--generate", "2", "--fps", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed:  4/4"))
        .stdout(predicate::str::contains("generated:  2"))
        .stdout(predicate::str::contains("ring:       0 segments").not());
}

#[test]
fn simulate_json_summary() {
    let output = journey_cmd()
        .args(["simulate", "one two three", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["finished"], true);
    assert_eq!(summary["prompt_tokens"], 3);
    assert_eq!(summary["completed"], 3);
    assert_eq!(summary["active_layer"], 4);
    assert!(summary["frames"].as_u64().unwrap() > 0);
    assert!(summary["events"].as_u64().unwrap() > 0);
    assert!(summary["teardown"].is_object());
}

#[test]
fn simulate_stops_at_max_frames() {
    journey_cmd()
        .args(["simulate", "a b c", "--max-frames", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames:     10"))
        .stdout(predicate::str::contains("status:     incomplete"));
}

#[test]
fn simulate_rejects_empty_prompt() {
    journey_cmd()
        .args(["simulate", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prompt has no tokens"));
}

#[test]
fn simulate_rejects_zero_fps() {
    journey_cmd()
        .args(["simulate", "a", "--fps", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fps must be positive"));
}

#[test]
fn ring_layout_degrees() {
    journey_cmd()
        .args(["ring", "the:0.5", "a:0.3", "an:0.2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("180.0°"))
        .stdout(predicate::str::contains("108.0°"))
        .stdout(predicate::str::contains("72.0°"))
        .stdout(predicate::str::contains("288.0°"));
}

#[test]
fn ring_sorts_by_probability() {
    let output = journey_cmd()
        .args(["ring", "low:0.1", "high:0.6", "mid:0.3"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let order: Vec<&str> = stdout
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(order, ["high", "mid", "low"]);
}

#[test]
fn ring_respects_top_k_from_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "top_k = 2\n");
    journey_cmd()
        .arg("--config")
        .arg(&config)
        .args(["ring", "a:0.4", "b:0.3", "c:0.2", "d:0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 candidates beyond top 2 omitted"));
}

#[test]
fn ring_rejects_malformed_candidate() {
    journey_cmd()
        .args(["ring", "nocolon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected token:probability"));

    journey_cmd()
        .args(["ring", "x:1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must lie in [0, 1]"));
}

#[test]
fn config_prints_defaults() {
    journey_cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("layer_count = 3"))
        .stdout(predicate::str::contains("arc_capacity = 100"))
        .stdout(predicate::str::contains("top_k = 8"));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "layer_count = 6\n");
    journey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("layer_count = 6"))
        .stdout(predicate::str::contains("arc_capacity = 100"));
}

#[test]
fn config_from_env() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "layer_count = 2\n");
    journey_cmd()
        .env("JOURNEY_CONFIG", &config)
        .args(["simulate", "x y", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"active_layer\": 3"));
}

#[test]
fn invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "arc_capacity = 0\n");
    journey_cmd()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn missing_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    journey_cmd()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}
