mod play;
mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use journey_core::{
    ArcPoolStats, Candidate, DiagnosticSnapshot, RingSegment, SceneConfig, SceneEvent,
    TeardownReport, compute_ring_segments,
};
use serde::Serialize;

use crate::session::Session;

#[derive(Parser)]
#[command(name = "journey", about = "Token journey engine: simulate and play transformer layer animations")]
struct Cli {
    /// TOML config file (defaults to $JOURNEY_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine headless at a fixed frame rate until it goes idle
    Simulate {
        /// Prompt text, tokenized on whitespace
        prompt: String,

        /// Tokens to generate after the prompt
        #[arg(long, default_value_t = 0)]
        generate: usize,

        /// Simulated frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Stop after this many frames even if the scene is still animating
        #[arg(long, default_value_t = 100_000)]
        max_frames: u64,

        /// Seed for the mock attention and sampling source
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drive the engine in real time, printing scene events as JSON lines
    Play {
        /// Prompt text, tokenized on whitespace
        prompt: String,

        /// Tokens to generate after the prompt
        #[arg(long, default_value_t = 0)]
        generate: usize,

        /// Time multiplier (2.0 plays twice as fast)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Frames per second of the playback loop
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Seed for the mock attention and sampling source
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the probability ring layout for candidates given as token:prob
    Ring {
        #[arg(required = true)]
        candidates: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Load the scene config from `--config`, else `$JOURNEY_CONFIG`, else defaults.
fn load_config(path: Option<&Path>) -> Result<SceneConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("JOURNEY_CONFIG").ok().map(PathBuf::from));

    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: SceneConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse config {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => SceneConfig::default(),
    };
    config.validate().context("invalid config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Simulate {
            prompt,
            generate,
            fps,
            max_frames,
            seed,
            json,
        } => cmd_simulate(config, prompt, *generate, *fps, *max_frames, *seed, *json),
        Commands::Play {
            prompt,
            generate,
            speed,
            fps,
            seed,
        } => play::run(config, prompt, *generate, *speed, *fps, *seed).await,
        Commands::Ring { candidates } => cmd_ring(&config, candidates),
        Commands::Config => cmd_config(&config),
    }
}

#[derive(Serialize)]
struct SimulationSummary {
    frames: u64,
    finished: bool,
    prompt_tokens: usize,
    generated: usize,
    completed: usize,
    active_layer: usize,
    layer_name: String,
    events: usize,
    arcs: ArcPoolStats,
    ring: Vec<RingSegment>,
    diagnostics: DiagnosticSnapshot,
    teardown: TeardownReport,
}

fn cmd_simulate(
    config: SceneConfig,
    prompt: &str,
    generate: usize,
    fps: f64,
    max_frames: u64,
    seed: u64,
    json: bool,
) -> Result<()> {
    anyhow::ensure!(fps.is_finite() && fps > 0.0, "--fps must be positive, got {fps}");
    let frame_ms = 1000.0 / fps;

    let mut session = Session::new(config, prompt, generate, seed)?;
    let mut events = 0;
    let mut frames = 0;
    while !session.is_finished() && frames < max_frames {
        session.frame(frames as f64 * frame_ms);
        events += session.drain_events().len();
        frames += 1;
    }
    if !session.is_finished() {
        tracing::warn!("stopped after {frames} frames with the scene still animating");
    }

    let end_ms = frames as f64 * frame_ms;
    let scene = session.scene();
    let active_layer = scene.active_layer();
    let layer_name = scene.catalog().name(active_layer);
    let completed = scene.completed();
    let arcs = scene.arcs().stats();
    let ring = scene.ring().iter().map(|s| s.segment.clone()).collect();
    let diagnostics = scene.snapshot(end_ms);
    let (finished, prompt_tokens, generated) =
        (session.is_finished(), session.prompt_len(), session.generated());
    let teardown = session.into_scene().teardown();

    let summary = SimulationSummary {
        frames,
        finished,
        prompt_tokens,
        generated,
        completed,
        active_layer,
        layer_name,
        events,
        arcs,
        ring,
        diagnostics,
        teardown,
    };

    if json {
        let out = serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
        println!("{out}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(s: &SimulationSummary) {
    let total = s.prompt_tokens + s.generated;
    println!("frames:     {}", s.frames);
    println!("status:     {}", if s.finished { "finished" } else { "incomplete" });
    println!("completed:  {}/{}", s.completed, total);
    println!("generated:  {}", s.generated);
    println!("layer:      {} ({})", s.active_layer, s.layer_name);
    println!("events:     {}", s.events);
    println!(
        "arcs:       {} live, {} allocated, {} dropped",
        s.arcs.occupied, s.arcs.allocated, s.arcs.dropped
    );
    println!("ring:       {} segments", s.ring.len());
    let g = &s.diagnostics.geometries;
    println!(
        "geometries: created={}, reused={}, rate={:.2}",
        g.created, g.reused, g.reuse_rate
    );
    let t = &s.diagnostics.torus;
    println!(
        "torus:      live={}, reused={}, evicted={}",
        t.pool.live_count, t.pool.reused, t.evicted
    );
    println!(
        "disposed:   {} resources ({} failed)",
        s.teardown.disposed(),
        s.teardown.failed()
    );
}

fn parse_candidate(arg: &str, id: u32) -> Result<Candidate> {
    let (token, prob) = arg
        .rsplit_once(':')
        .with_context(|| format!("expected token:probability, got '{arg}'"))?;
    let probability: f64 = prob
        .parse()
        .with_context(|| format!("invalid probability in '{arg}'"))?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&probability),
        "probability in '{arg}' must lie in [0, 1]"
    );
    Ok(Candidate::new(token, probability, id))
}

fn cmd_ring(config: &SceneConfig, args: &[String]) -> Result<()> {
    let candidates = args
        .iter()
        .enumerate()
        .map(|(i, arg)| parse_candidate(arg, i as u32))
        .collect::<Result<Vec<_>>>()?;

    let total: f64 = candidates.iter().map(|c| c.probability).sum();
    if total > 1.0 + 1e-9 {
        tracing::warn!("probabilities sum to {total:.3}; the ring will overlap itself");
    }

    let mut segments = Vec::new();
    compute_ring_segments(&candidates, config.ring_radius, config.top_k, &mut segments);
    for s in &segments {
        println!(
            "{:<12} p={:.3}  start={:>6.1}°  span={:>6.1}°  label=({:.2}, {:.2})",
            s.token,
            s.probability,
            s.start_angle.to_degrees(),
            s.arc_angle.to_degrees(),
            s.position.x,
            s.position.z
        );
    }
    if segments.len() < candidates.len() {
        println!(
            "({} candidates beyond top {} omitted)",
            candidates.len() - segments.len(),
            config.top_k
        );
    }
    Ok(())
}

fn cmd_config(config: &SceneConfig) -> Result<()> {
    let out = toml::to_string_pretty(config).context("failed to serialize config")?;
    print!("{out}");
    Ok(())
}

/// One line per event, shared by `play` output.
pub(crate) fn event_line(at_ms: f64, event: &SceneEvent) -> Result<String> {
    #[derive(Serialize)]
    struct Line<'a> {
        at_ms: f64,
        #[serde(flatten)]
        event: &'a SceneEvent,
    }
    serde_json::to_string(&Line { at_ms, event }).context("failed to serialize event")
}
