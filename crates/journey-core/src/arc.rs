//! Attention arcs: selection from raw weights and the bounded slot pool that
//! holds the visible ones.

use serde::Serialize;

use crate::config::SceneConfig;
use crate::token::AttentionWeight;
use crate::token_state::Phase;
use crate::vec3::Vec3;

/// Quadratic curve from the query token to the key token.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ArcDescriptor {
    pub start: Vec3,
    pub control: Vec3,
    pub end: Vec3,
    pub weight: f64,
    pub layer: usize,
    pub query: usize,
    pub key: usize,
}

impl ArcDescriptor {
    /// Point along the curve at `t` in [0, 1].
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.start.quadratic_bezier(self.control, self.end, t)
    }
}

/// Build the arc for one weight. The control point sits above the midpoint,
/// lifted by `weight * max_arc_height`. Returns `None` when either index has
/// no position.
pub fn compute_arc(
    weight: &AttentionWeight,
    positions: &[Vec3],
    max_arc_height: f64,
) -> Option<ArcDescriptor> {
    let start = *positions.get(weight.query)?;
    let end = *positions.get(weight.key)?;
    let mid = start.midpoint(end);
    let control = Vec3::new(mid.x, mid.y + weight.weight * max_arc_height, mid.z);

    Some(ArcDescriptor {
        start,
        control,
        end,
        weight: weight.weight,
        layer: weight.layer,
        query: weight.query,
        key: weight.key,
    })
}

/// Fill `out` with the arcs to draw for `layer`: weights of that layer above
/// the threshold whose indices are in range, capped at `max_lines`, in input
/// order. `out` is cleared first so the caller can reuse it every frame.
pub fn select_arcs(
    weights: &[AttentionWeight],
    layer: usize,
    positions: &[Vec3],
    config: &SceneConfig,
    out: &mut Vec<ArcDescriptor>,
) {
    out.clear();
    if positions.is_empty() {
        return;
    }

    let selected = weights
        .iter()
        .filter(|w| w.layer == layer && w.weight > config.min_weight_threshold)
        .filter(|w| w.query < positions.len() && w.key < positions.len())
        .take(config.max_lines)
        .filter_map(|w| compute_arc(w, positions, config.max_arc_height));
    out.extend(selected);
}

#[derive(Clone, Debug, Default)]
pub struct ArcSlot {
    pub descriptor: Option<ArcDescriptor>,
    pub opacity: f64,
}

impl ArcSlot {
    pub fn is_occupied(&self) -> bool {
        self.descriptor.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ArcPoolStats {
    pub capacity: usize,
    pub occupied: usize,
    pub allocated: u64,
    pub dropped: u64,
}

/// Fixed-capacity slots for attention arcs.
///
/// Allocation scans for the first free slot. A full pool drops the request
/// and bumps `dropped`; nothing is queued or retried.
pub struct ArcSlotPool {
    slots: Vec<ArcSlot>,
    occupied: usize,
    allocated: u64,
    dropped: u64,
}

impl ArcSlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![ArcSlot::default(); capacity],
            occupied: 0,
            allocated: 0,
            dropped: 0,
        }
    }

    pub fn allocate(&mut self, descriptor: ArcDescriptor) -> Option<usize> {
        let Some(index) = self.slots.iter().position(|s| !s.is_occupied()) else {
            self.dropped += 1;
            return None;
        };

        let slot = &mut self.slots[index];
        slot.descriptor = Some(descriptor);
        slot.opacity = 0.0;
        self.occupied += 1;
        self.allocated += 1;
        Some(index)
    }

    pub fn release(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if slot.descriptor.take().is_some() {
            slot.opacity = 0.0;
            self.occupied -= 1;
        }
    }

    pub fn clear(&mut self) {
        if self.occupied == 0 {
            return;
        }
        for slot in &mut self.slots {
            slot.descriptor = None;
            slot.opacity = 0.0;
        }
        self.occupied = 0;
    }

    /// Advance fade-in of occupied slots by `dt_secs`. Only the attention
    /// phase fades; there is no fade-out.
    pub fn fade(&mut self, dt_secs: f64, phase: Phase, rate: f64) {
        if phase != Phase::Attention || self.occupied == 0 {
            return;
        }
        for slot in self.slots.iter_mut().filter(|s| s.is_occupied()) {
            slot.opacity = (slot.opacity + rate * dt_secs).min(1.0);
        }
    }

    /// True while any occupied slot is below full opacity.
    pub fn is_fading(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.is_occupied() && s.opacity < 1.0)
    }

    pub fn slot(&self, index: usize) -> Option<&ArcSlot> {
        self.slots.get(index)
    }

    /// Occupied slots with their indices.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (usize, &ArcSlot)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.is_occupied())
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn stats(&self) -> ArcPoolStats {
        ArcPoolStats {
            capacity: self.capacity(),
            occupied: self.occupied,
            allocated: self.allocated,
            dropped: self.dropped,
        }
    }
}
