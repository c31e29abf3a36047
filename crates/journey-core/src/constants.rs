/// Number of transformer blocks between the embedding layer and the LM head.
/// Layer indices run 0..=LAYER_COUNT + 1.
pub const LAYER_COUNT: usize = 3;

/// Time a token spends in the attention phase of each layer (ms).
pub const ATTENTION_DURATION_MS: f64 = 750.0;

/// Time a token spends in the feed-forward phase of each layer (ms).
pub const FFN_DURATION_MS: f64 = 750.0;

/// Distance under which a moving token counts as arrived.
pub const ARRIVAL_EPSILON: f64 = 0.2;

/// Exponential approach rate (1/s). `1 - exp(-k/60)` equals a 0.04 step at 60 Hz.
pub const LERP_RATE: f64 = 2.449_319_671_215_31;

/// Largest frame delta fed to the state machines (ms).
pub const MAX_FRAME_DELTA_MS: f64 = 100.0;

/// Amplitude of the scale pulse during the FFN phase.
pub const FFN_PULSE_AMPLITUDE: f64 = 0.2;

/// Opacity gained per second by an arc fading in.
pub const ARC_FADE_RATE: f64 = 2.0;

/// Default capacity of the attention arc slot pool.
pub const MAX_ARCS: usize = 100;

/// Maximum arcs requested per layer.
pub const MAX_LINES: usize = 50;

/// Weights at or below this are not drawn.
pub const MIN_WEIGHT_THRESHOLD: f64 = 0.1;

/// Control point lift for a weight of 1.0.
pub const MAX_ARC_HEIGHT: f64 = 1.5;

/// Instance capacity of each token category pool.
pub const MAX_TOKENS: usize = 128;

/// Tokens shown in the layer journey (input first, then generated).
pub const MAX_VISIBLE_TOKENS: usize = 20;

/// Candidates shown on the probability ring.
pub const TOP_K: usize = 8;

pub const RING_RADIUS: f64 = 2.0;

pub const RING_THICKNESS: f64 = 0.1;

/// Torus angle quantization step (radians).
pub const ANGLE_QUANTUM: f64 = 0.01;

/// Torus pool size before free entries are evicted.
pub const TORUS_POOL_MAX: usize = 256;

/// Horizontal distance between neighbouring tokens.
pub const TOKEN_SPACING: f64 = 1.2;

pub const LAYER_HEIGHT: f64 = 3.0;

pub const LAYER_GAP: f64 = 0.5;

/// Y coordinate of layer 0.
pub const LAYER_TOP_Y: f64 = 2.0;

/// Where journey tokens appear before dropping into the embedding layer.
pub const SPAWN_HEIGHT: f64 = 10.0;
pub const SPAWN_DEPTH: f64 = -2.0;

/// Y coordinate of parked (hidden) instances.
pub const PARKED_Y: f64 = -1000.0;

/// Sampling interval of diagnostic snapshots (ms).
pub const DIAGNOSTICS_INTERVAL_MS: f64 = 5000.0;

/// Radius of token spheres before per-layer scaling.
pub const TOKEN_SPHERE_RADIUS: f64 = 0.35;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Scale pulse of generated tokens while the model is inferring.
pub const GENERATING_PULSE_AMPLITUDE: f64 = 0.1;

/// Angular rate of the generating pulse (rad/ms).
pub const GENERATING_PULSE_RATE: f64 = 0.004;

/// Glow instance size relative to its token.
pub const GLOW_SCALE: f64 = 1.5;

/// Footprint of the translucent layer boxes.
pub const LAYER_BOX_WIDTH: f64 = 16.0;
pub const LAYER_BOX_DEPTH: f64 = 5.0;
