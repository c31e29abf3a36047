//! Scene geometry: where layers sit, where tokens line up, and how each
//! layer looks.

use serde::Serialize;

use crate::constants::{
    LAYER_GAP, LAYER_HEIGHT, LAYER_TOP_Y, SPAWN_DEPTH, SPAWN_HEIGHT, TOKEN_SPACING,
    TOKEN_SPHERE_RADIUS,
};
use crate::resource::{MaterialDesc, ResourceDesc};
use crate::vec3::Vec3;

/// Appearance of token spheres inside one layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LayerVisual {
    /// Sphere scale relative to the shared 0.35 radius mesh.
    pub scale: f64,
    pub segments: u32,
    pub color: &'static str,
    pub emissive: f64,
}

impl LayerVisual {
    /// Scale factor applied to the shared token sphere.
    pub fn instance_scale(&self) -> f64 {
        self.scale / TOKEN_SPHERE_RADIUS
    }
}

const EMBEDDING_VISUAL: LayerVisual = LayerVisual {
    scale: 0.3,
    segments: 4,
    color: "#8b5cf6",
    emissive: 0.2,
};

const BLOCK_VISUALS: [LayerVisual; 3] = [
    LayerVisual {
        scale: 0.38,
        segments: 8,
        color: "#3b82f6",
        emissive: 0.4,
    },
    LayerVisual {
        scale: 0.42,
        segments: 12,
        color: "#06b6d4",
        emissive: 0.5,
    },
    LayerVisual {
        scale: 0.45,
        segments: 16,
        color: "#10b981",
        emissive: 0.6,
    },
];

const LM_HEAD_VISUAL: LayerVisual = LayerVisual {
    scale: 0.5,
    segments: 24,
    color: "#f59e0b",
    emissive: 0.8,
};

/// Static description of the layer stack for a given block count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerCatalog {
    layer_count: usize,
}

impl LayerCatalog {
    pub fn new(layer_count: usize) -> Self {
        Self { layer_count }
    }

    pub fn lm_head(&self) -> usize {
        self.layer_count + 1
    }

    /// Embedding, every block, LM head.
    pub fn len(&self) -> usize {
        self.layer_count + 2
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn visual(&self, layer: usize) -> LayerVisual {
        if layer == 0 {
            EMBEDDING_VISUAL
        } else if layer >= self.lm_head() {
            LM_HEAD_VISUAL
        } else {
            // Spread the block palette over however many blocks there are
            let slot = (layer - 1) * BLOCK_VISUALS.len() / self.layer_count.max(1);
            BLOCK_VISUALS[slot.min(BLOCK_VISUALS.len() - 1)]
        }
    }

    pub fn name(&self, layer: usize) -> String {
        if layer == 0 {
            "Embedding Layer".to_string()
        } else if layer >= self.lm_head() {
            "LM Head (Output)".to_string()
        } else {
            format!("Transformer Block {layer}")
        }
    }

    pub fn description(&self, layer: usize) -> &'static str {
        if layer == 0 {
            "Token IDs → embedding vectors"
        } else if layer >= self.lm_head() {
            "Logits → Sampling"
        } else {
            "Self-Attention + FFN"
        }
    }

    pub fn label(&self, layer: usize) -> LayerLabel {
        LayerLabel {
            layer,
            name: self.name(layer),
            description: self.description(layer),
            color: self.visual(layer).color,
            anchor: Vec3::new(0.0, layer_y(layer as i32) + 1.5, 2.0),
        }
    }

    /// Registry key and descriptor of the sphere used in `layer`.
    pub fn sphere(&self, layer: usize) -> (String, ResourceDesc) {
        let visual = self.visual(layer);
        (
            format!("token-sphere-{layer}"),
            ResourceDesc::Sphere {
                radius: TOKEN_SPHERE_RADIUS,
                segments: visual.segments,
            },
        )
    }

    /// Registry key and descriptor of the material used in `layer`.
    pub fn material(&self, layer: usize) -> (String, ResourceDesc) {
        let visual = self.visual(layer);
        (
            format!("token-material-{layer}"),
            ResourceDesc::Material(MaterialDesc::glowing(visual.color, visual.emissive)),
        )
    }
}

/// Label shown while tokens are working inside a layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerLabel {
    pub layer: usize,
    pub name: String,
    pub description: &'static str,
    pub color: &'static str,
    pub anchor: Vec3,
}

/// Y coordinate of a layer's centre. Layers stack downward from layer 0.
pub fn layer_y(layer: i32) -> f64 {
    LAYER_TOP_Y - layer as f64 * (LAYER_HEIGHT + LAYER_GAP)
}

/// X coordinate of token `index` in a row of `count`, centred on the origin.
pub fn token_x(index: usize, count: usize) -> f64 {
    let total_width = count as f64 * TOKEN_SPACING;
    -total_width / 2.0 + index as f64 * TOKEN_SPACING
}

/// Where a journey token first appears, above and behind the layer stack.
pub fn spawn_position(x: f64) -> Vec3 {
    Vec3::new(x, SPAWN_HEIGHT, SPAWN_DEPTH)
}

/// Resting point of a token inside `layer`.
pub fn layer_slot(x: f64, layer: i32) -> Vec3 {
    Vec3::new(x, layer_y(layer), 0.0)
}
