use serde::{Deserialize, Serialize};

use crate::constants::{
    ARC_FADE_RATE, ARRIVAL_EPSILON, ATTENTION_DURATION_MS, DIAGNOSTICS_INTERVAL_MS,
    FFN_DURATION_MS, FFN_PULSE_AMPLITUDE, LAYER_COUNT, LERP_RATE, MAX_ARC_HEIGHT, MAX_ARCS,
    MAX_FRAME_DELTA_MS, MAX_LINES, MAX_TOKENS, MAX_VISIBLE_TOKENS, MIN_WEIGHT_THRESHOLD,
    RING_RADIUS, TOP_K, TORUS_POOL_MAX,
};
use crate::error::{EngineError, Result};

/// Tunables of a scene. Every field has a default, so a partial TOML file
/// only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Transformer blocks between embedding and LM head.
    pub layer_count: usize,
    pub attention_duration_ms: f64,
    pub ffn_duration_ms: f64,
    pub arrival_epsilon: f64,
    /// Exponential approach rate in 1/s.
    pub lerp_rate: f64,
    pub max_frame_delta_ms: f64,
    pub ffn_pulse_amplitude: f64,
    pub arc_capacity: usize,
    pub arc_fade_rate: f64,
    pub max_lines: usize,
    pub min_weight_threshold: f64,
    pub max_arc_height: f64,
    /// Instance slots per token category.
    pub max_tokens: usize,
    pub max_visible_tokens: usize,
    pub top_k: usize,
    pub ring_radius: f64,
    pub torus_pool_max: usize,
    pub diagnostics_interval_ms: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            layer_count: LAYER_COUNT,
            attention_duration_ms: ATTENTION_DURATION_MS,
            ffn_duration_ms: FFN_DURATION_MS,
            arrival_epsilon: ARRIVAL_EPSILON,
            lerp_rate: LERP_RATE,
            max_frame_delta_ms: MAX_FRAME_DELTA_MS,
            ffn_pulse_amplitude: FFN_PULSE_AMPLITUDE,
            arc_capacity: MAX_ARCS,
            arc_fade_rate: ARC_FADE_RATE,
            max_lines: MAX_LINES,
            min_weight_threshold: MIN_WEIGHT_THRESHOLD,
            max_arc_height: MAX_ARC_HEIGHT,
            max_tokens: MAX_TOKENS,
            max_visible_tokens: MAX_VISIBLE_TOKENS,
            top_k: TOP_K,
            ring_radius: RING_RADIUS,
            torus_pool_max: TORUS_POOL_MAX,
            diagnostics_interval_ms: DIAGNOSTICS_INTERVAL_MS,
        }
    }
}

impl SceneConfig {
    /// Index of the last (LM head) layer.
    pub fn lm_head_layer(&self) -> i32 {
        self.layer_count as i32 + 1
    }

    /// Number of layers a token visits: embedding, blocks, LM head.
    pub fn total_layers(&self) -> usize {
        self.layer_count + 2
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("attention_duration_ms", self.attention_duration_ms),
            ("ffn_duration_ms", self.ffn_duration_ms),
            ("arrival_epsilon", self.arrival_epsilon),
            ("lerp_rate", self.lerp_rate),
            ("max_frame_delta_ms", self.max_frame_delta_ms),
            ("arc_fade_rate", self.arc_fade_rate),
            ("ring_radius", self.ring_radius),
            ("diagnostics_interval_ms", self.diagnostics_interval_ms),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        let nonzero = [
            ("arc_capacity", self.arc_capacity),
            ("max_tokens", self.max_tokens),
            ("max_visible_tokens", self.max_visible_tokens),
            ("torus_pool_max", self.torus_pool_max),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }

        if !(0.0..=1.0).contains(&self.min_weight_threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "min_weight_threshold must lie in [0, 1], got {}",
                self.min_weight_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_layer_indices() {
        let cfg = SceneConfig::default();
        assert_eq!(cfg.lm_head_layer(), 4);
        assert_eq!(cfg.total_layers(), 5);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let cfg = SceneConfig {
            arc_capacity: 0,
            ..SceneConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("arc_capacity"), "got: {err}");
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let cfg = SceneConfig {
            ffn_duration_ms: 0.0,
            ..SceneConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SceneConfig {
            lerp_rate: f64::NAN,
            ..SceneConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: SceneConfig = toml::from_str("layer_count = 6\narc_capacity = 12\n").unwrap();
        assert_eq!(cfg.layer_count, 6);
        assert_eq!(cfg.arc_capacity, 12);
        assert_eq!(cfg.max_lines, MAX_LINES);
        assert!((cfg.attention_duration_ms - ATTENTION_DURATION_MS).abs() < 1e-12);
    }
}
