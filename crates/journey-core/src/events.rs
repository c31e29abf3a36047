use serde::Serialize;

use crate::token::TokenKey;
use crate::token_state::Phase;

/// Low-frequency notifications for the host (UI labels, status lines, logs).
/// Per-frame transforms travel through the instance pools instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SceneEvent {
    LayerEntered {
        token: TokenKey,
        layer: usize,
    },
    ActiveLayerChanged {
        layer: usize,
    },
    DisplayPhaseChanged {
        phase: Phase,
    },
    TokenCompleted {
        token: TokenKey,
    },
    /// The token could not get an instance slot and is not drawn.
    TokenSkipped {
        token: TokenKey,
    },
    ArcsRebuilt {
        layer: usize,
        requested: usize,
        allocated: usize,
        dropped: usize,
    },
    /// The display phase left attention and every arc slot was released.
    ArcsHidden {
        released: usize,
    },
    RingShown {
        segments: usize,
    },
    RingHidden,
    LabelChanged {
        layer: Option<usize>,
    },
}
