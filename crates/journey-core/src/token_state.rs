use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SceneConfig;
use crate::layout::{layer_slot, spawn_position};
use crate::token::TokenKey;
use crate::vec3::Vec3;

/// Stage of a token within one layer's visualization cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Moving,
    Attention,
    Ffn,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Moving => "moving",
            Phase::Attention => "attention",
            Phase::Ffn => "ffn",
            Phase::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Phase change produced by one [`TokenAnimationState::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Arrived in a layer and started attention there.
    EnteredLayer(usize),
    StartedFfn,
    /// Left for the next layer (or the exit slot after the LM head).
    StartedMoving { toward: i32 },
    Completed,
}

/// Per-token animation state.
///
/// Phases cycle `moving → attention → ffn → moving` once per layer. Arriving
/// after the LM head completes the token; a completed state never changes
/// again.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenAnimationState {
    pub key: TokenKey,
    pub current_position: Vec3,
    pub target_position: Vec3,
    pub current_layer: i32,
    pub phase: Phase,
    pub phase_start_ms: f64,
    pub is_complete: bool,
}

impl TokenAnimationState {
    /// New token at the spawn point, heading for the embedding layer.
    pub fn new(key: TokenKey, x: f64, now_ms: f64) -> Self {
        Self {
            key,
            current_position: spawn_position(x),
            target_position: layer_slot(x, 0),
            current_layer: -1,
            phase: Phase::Moving,
            phase_start_ms: now_ms,
            is_complete: false,
        }
    }

    /// Move the token's column, keeping its vertical progress.
    pub fn retarget_x(&mut self, x: f64) {
        self.target_position.x = x;
    }

    /// Layer used for the global active-layer minimum.
    pub fn active_layer(&self) -> i32 {
        self.current_layer.max(0)
    }

    pub fn is_travelling(&self, config: &SceneConfig) -> bool {
        !self.is_complete
            && self.current_position.distance(self.target_position) >= config.arrival_epsilon
    }

    /// Advance by one tick. Position approaches the target with a factor
    /// `1 - exp(-k·dt)`, so travel time does not depend on the tick rate.
    /// At most one phase transition happens per call.
    pub fn advance(&mut self, now_ms: f64, dt_ms: f64, config: &SceneConfig) -> Option<Transition> {
        if self.is_complete {
            return None;
        }

        if self.is_travelling(config) {
            let alpha = 1.0 - (-config.lerp_rate * dt_ms / 1000.0).exp();
            self.current_position = self.current_position.lerp(self.target_position, alpha);
            return None;
        }

        let elapsed = now_ms - self.phase_start_ms;
        match self.phase {
            Phase::Moving => {
                self.current_layer += 1;
                self.phase_start_ms = now_ms;
                if self.current_layer > config.lm_head_layer() {
                    self.phase = Phase::Complete;
                    self.is_complete = true;
                    Some(Transition::Completed)
                } else {
                    self.phase = Phase::Attention;
                    Some(Transition::EnteredLayer(self.current_layer as usize))
                }
            }
            Phase::Attention if elapsed > config.attention_duration_ms => {
                self.phase = Phase::Ffn;
                self.phase_start_ms = now_ms;
                Some(Transition::StartedFfn)
            }
            Phase::Ffn if elapsed > config.ffn_duration_ms => {
                let toward = self.current_layer + 1;
                self.phase = Phase::Moving;
                self.phase_start_ms = now_ms;
                self.target_position = layer_slot(self.target_position.x, toward);
                Some(Transition::StartedMoving { toward })
            }
            _ => None,
        }
    }

    /// Scale multiplier for the FFN pulse: one sine cycle per FFN phase.
    pub fn pulse_scale(&self, now_ms: f64, config: &SceneConfig) -> f64 {
        if self.phase != Phase::Ffn {
            return 1.0;
        }
        let t = (now_ms - self.phase_start_ms) / config.ffn_duration_ms;
        1.0 + config.ffn_pulse_amplitude * (t * std::f64::consts::TAU).sin()
    }
}
