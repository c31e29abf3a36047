//! Integration tests for `journey play`: it exits on its own once the scene is
//! idle, and exits cleanly on SIGTERM/SIGINT while still animating.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn journey_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("journey").into()
}

fn spawn_play(args: &[&str]) -> std::process::Child {
    Command::new(journey_binary())
        .arg("play")
        .args(args)
        .env_remove("JOURNEY_CONFIG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn journey play")
}

/// Block until the first event line arrives, so the playback loop is running.
#[cfg(unix)]
fn wait_for_first_event(child: &mut std::process::Child) -> BufReader<std::process::ChildStdout> {
    let stdout = child.stdout.take().expect("stdout pipe");
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader.read_line(&mut line).expect("read first event");
    let event: serde_json::Value = serde_json::from_str(&line).expect("event is JSON");
    assert!(event.get("event").is_some(), "unexpected line: {line}");
    reader
}

#[test]
fn play_exits_when_idle() {
    let child = spawn_play(&["one two", "--speed", "50", "--fps", "120"]);

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    let elapsed = start.elapsed();

    assert!(output.status.success(), "play should exit 0, got {}", output.status);
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let completed = events
        .iter()
        .filter(|e| e["event"] == "token_completed")
        .count();
    assert_eq!(completed, 2);
    assert!(events.iter().all(|e| e["at_ms"].is_number()));
    assert!(stdout.lines().last().unwrap().starts_with("finished after"));
}

#[test]
fn play_rejects_nonpositive_speed() {
    let output = spawn_play(&["hello", "--speed", "0"])
        .wait_with_output()
        .expect("wait");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--speed must be positive"));
}

#[cfg(unix)]
fn assert_signal_exits_cleanly(signal: libc::c_int) {
    // Slow playback: the scene is still animating when the signal lands
    let mut child = spawn_play(&["a b c d", "--generate", "5", "--speed", "0.5"]);
    let reader = wait_for_first_event(&mut child);

    unsafe {
        libc::kill(child.id() as libc::pid_t, signal);
    }

    let start = Instant::now();
    let status = child.wait().expect("wait");
    let elapsed = start.elapsed();

    assert!(status.success(), "play should exit 0 on signal, got {status}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    let mut rest = String::new();
    for line in reader.lines() {
        rest = line.expect("read stdout");
    }
    assert!(rest.starts_with("interrupted after"), "last line: {rest}");
}

#[cfg(unix)]
#[test]
fn play_exits_on_sigterm() {
    assert_signal_exits_cleanly(libc::SIGTERM);
}

#[cfg(unix)]
#[test]
fn play_exits_on_sigint() {
    assert_signal_exits_cleanly(libc::SIGINT);
}
