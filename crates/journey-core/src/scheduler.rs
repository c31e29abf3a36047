//! Scene-wide view derived from all token states: the active layer, the
//! display phase and the layer label. Each is reported only on change.

use crate::events::SceneEvent;
use crate::token_state::{Phase, TokenAnimationState};

#[derive(Clone, Debug, Default)]
pub struct LayerScheduler {
    active_layer: Option<usize>,
    display_phase: Option<Phase>,
    label: Option<usize>,
}

impl LayerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported active layer, 0 before any token was observed.
    pub fn active_layer(&self) -> usize {
        self.active_layer.unwrap_or(0)
    }

    pub fn display_phase(&self) -> Phase {
        self.display_phase.unwrap_or(Phase::Moving)
    }

    pub fn label(&self) -> Option<usize> {
        self.label
    }

    /// Show the label of a layer a token just entered.
    pub fn layer_entered(&mut self, layer: usize, events: &mut Vec<SceneEvent>) {
        if self.label != Some(layer) {
            self.label = Some(layer);
            events.push(SceneEvent::LabelChanged { layer: Some(layer) });
        }
    }

    /// Recompute the scene-wide values. Returns true when the active layer
    /// changed.
    ///
    /// The active layer is the slowest non-complete token's layer (clamped at
    /// 0). Once every token has completed the last value is kept.
    pub fn observe<'a>(
        &mut self,
        states: impl IntoIterator<Item = &'a TokenAnimationState>,
        events: &mut Vec<SceneEvent>,
    ) -> bool {
        let mut min_layer: Option<usize> = None;
        let mut any_attention = false;
        let mut any_ffn = false;

        for state in states.into_iter().filter(|s| !s.is_complete) {
            let layer = state.active_layer() as usize;
            min_layer = Some(min_layer.map_or(layer, |m| m.min(layer)));
            match state.phase {
                Phase::Attention => any_attention = true,
                Phase::Ffn => any_ffn = true,
                _ => {}
            }
        }

        let phase = if any_attention {
            Phase::Attention
        } else if any_ffn {
            Phase::Ffn
        } else {
            Phase::Moving
        };
        if self.display_phase != Some(phase) {
            tracing::debug!("display phase -> {phase}");
            self.display_phase = Some(phase);
            events.push(SceneEvent::DisplayPhaseChanged { phase });
            if phase == Phase::Moving && self.label.take().is_some() {
                events.push(SceneEvent::LabelChanged { layer: None });
            }
        }

        match min_layer {
            Some(layer) if self.active_layer != Some(layer) => {
                tracing::debug!("active layer -> {layer}");
                self.active_layer = Some(layer);
                events.push(SceneEvent::ActiveLayerChanged { layer });
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
