//! Real-time playback: ticks the scene from a tokio interval and streams its
//! events to stdout until the session finishes or the process is signalled.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use journey_core::SceneConfig;
use tokio::time::MissedTickBehavior;

use crate::event_line;
use crate::session::Session;

pub async fn run(
    config: SceneConfig,
    prompt: &str,
    generate: usize,
    speed: f64,
    fps: f64,
    seed: u64,
) -> Result<()> {
    anyhow::ensure!(speed.is_finite() && speed > 0.0, "--speed must be positive, got {speed}");
    anyhow::ensure!(fps.is_finite() && fps > 0.0, "--fps must be positive, got {fps}");

    let mut session = Session::new(config, prompt, generate, seed)?;
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal()?;
    tokio::pin!(shutdown);

    let start = Instant::now();
    let mut interrupted = false;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                interrupted = true;
                break;
            }
            _ = interval.tick() => {
                let now_ms = start.elapsed().as_secs_f64() * 1000.0 * speed;
                session.frame(now_ms);
                for event in session.drain_events() {
                    println!("{}", event_line(now_ms, &event)?);
                }
                if session.is_finished() {
                    break;
                }
            }
        }
    }

    let frames = session.scene().frames();
    let completed = session.scene().completed();
    let report = session.into_scene().teardown();
    println!(
        "{} after {frames} frames: {completed} tokens completed, {} resources disposed",
        if interrupted { "interrupted" } else { "finished" },
        report.disposed()
    );
    Ok(())
}

/// Registers SIGINT and SIGTERM handlers up front and resolves on the first
/// of them, so a signal sent right after startup is never missed.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt()).context("failed to listen for SIGINT")?;
    let mut terminate = signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    })
}
