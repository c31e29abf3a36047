//! The frame scheduler: owns every pool and token state and advances them
//! once per `tick`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::arc::{ArcDescriptor, ArcSlotPool, select_arcs};
use crate::config::SceneConfig;
use crate::constants::{
    GENERATING_PULSE_AMPLITUDE, GENERATING_PULSE_RATE, GLOW_SCALE, LAYER_BOX_DEPTH,
    LAYER_BOX_WIDTH, LAYER_HEIGHT, RING_THICKNESS,
};
use crate::diagnostics::{DiagnosticSampler, DiagnosticSnapshot};
use crate::error::Result;
use crate::events::SceneEvent;
use crate::instance::{InstanceSlotPools, InstanceTransform};
use crate::layout::{LayerCatalog, LayerLabel, layer_slot, token_x};
use crate::registry::GeometryRegistry;
use crate::resource::{DisposeReport, RenderBackend, ResourceDesc, ResourceHandle};
use crate::ring::{RingSegment, compute_ring_segments};
use crate::scheduler::LayerScheduler;
use crate::token::{
    AttentionWeight, Candidate, GenerationStatus, Token, TokenCategory, TokenKey,
};
use crate::token_state::{Phase, TokenAnimationState, Transition};
use crate::torus::TorusPool;
use crate::vec3::Vec3;

const LAYER_BOX_KEY: &str = "layer-box";

/// Result of one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame: u64,
    /// False once every token is complete, nothing fades and no input
    /// arrived since the previous tick.
    pub needs_redraw: bool,
    pub active_layer: usize,
    pub display_phase: Phase,
    /// Present on ticks where a diagnostic sample was due.
    pub diagnostics: Option<DiagnosticSnapshot>,
}

/// Shared resources to draw the tokens of one layer with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerBinding {
    pub sphere: ResourceHandle,
    pub material: ResourceHandle,
    pub layer_box: ResourceHandle,
}

/// A visible ring segment and the torus it is drawn with.
#[derive(Clone, Debug, PartialEq)]
pub struct RingSlice {
    pub segment: RingSegment,
    pub torus: ResourceHandle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub frames: u64,
    pub torus: DisposeReport,
    pub geometries: DisposeReport,
    pub materials: DisposeReport,
}

impl TeardownReport {
    /// Torus pool and both registries combined.
    pub fn total(&self) -> DisposeReport {
        let mut total = self.torus;
        total.merge(self.geometries);
        total.merge(self.materials);
        total
    }

    pub fn disposed(&self) -> usize {
        self.total().disposed
    }

    pub fn failed(&self) -> usize {
        self.total().failed
    }
}

/// Token journey scene, generic over the host renderer.
///
/// Inputs arrive through the `set_*` methods and mark the scene dirty. The
/// host drives [`tick`](Self::tick) from its frame loop and reads results
/// through two channels: [`drain_events`](Self::drain_events) for discrete
/// changes and [`transforms`](Self::transforms) for per-instance data.
/// [`teardown`](Self::teardown) consumes the scene, so no tick can follow
/// resource disposal.
pub struct Scene<B: RenderBackend> {
    config: SceneConfig,
    catalog: LayerCatalog,
    backend: B,
    geometries: GeometryRegistry<B::Resource>,
    materials: GeometryRegistry<B::Resource>,
    torus: TorusPool<B::Resource>,
    arcs: ArcSlotPool,
    instances: InstanceSlotPools,
    states: BTreeMap<TokenKey, TokenAnimationState>,
    scheduler: LayerScheduler,
    sampler: DiagnosticSampler,

    input_tokens: Vec<Token>,
    generated_tokens: Vec<Token>,
    weights: Vec<AttentionWeight>,
    candidates: Vec<Candidate>,
    status: GenerationStatus,

    ring: Vec<RingSlice>,
    events: Vec<SceneEvent>,
    // Per-tick scratch, reused to avoid allocating every frame
    positions: Vec<Vec3>,
    arc_scratch: Vec<ArcDescriptor>,
    ring_scratch: Vec<RingSegment>,

    visible_count: usize,
    tokens_stale: bool,
    arcs_stale: bool,
    ring_stale: bool,
    dirty: bool,
    last_tick_ms: Option<f64>,
    frames: u64,
    completed: usize,
}

impl<B: RenderBackend> Scene<B> {
    pub fn new(config: SceneConfig, mut backend: B) -> Result<Self> {
        config.validate()?;

        let catalog = LayerCatalog::new(config.layer_count);
        let mut geometries = GeometryRegistry::new();
        geometries.get_or_create(LAYER_BOX_KEY, || {
            backend.build(&ResourceDesc::Box {
                width: LAYER_BOX_WIDTH,
                height: LAYER_HEIGHT,
                depth: LAYER_BOX_DEPTH,
            })
        });

        tracing::debug!(
            "scene: {} layers, {} arc slots, {} instances per pool",
            catalog.len(),
            config.arc_capacity,
            config.max_tokens
        );

        Ok(Self {
            catalog,
            geometries,
            materials: GeometryRegistry::new(),
            torus: TorusPool::new(config.torus_pool_max),
            arcs: ArcSlotPool::new(config.arc_capacity),
            instances: InstanceSlotPools::new(config.max_tokens),
            states: BTreeMap::new(),
            scheduler: LayerScheduler::new(),
            sampler: DiagnosticSampler::new(config.diagnostics_interval_ms),
            input_tokens: Vec::new(),
            generated_tokens: Vec::new(),
            weights: Vec::new(),
            candidates: Vec::new(),
            status: GenerationStatus::Idle,
            ring: Vec::new(),
            events: Vec::new(),
            positions: Vec::new(),
            arc_scratch: Vec::with_capacity(config.max_lines),
            ring_scratch: Vec::with_capacity(config.top_k),
            visible_count: 0,
            tokens_stale: false,
            arcs_stale: false,
            ring_stale: false,
            dirty: true,
            last_tick_ms: None,
            frames: 0,
            completed: 0,
            config,
            backend,
        })
    }

    // --- inputs ---

    /// Replace the input token list. Tokens keep their animation state by
    /// position, so appending does not restart earlier tokens.
    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.input_tokens = tokens;
        self.tokens_stale = true;
        self.arcs_stale = true;
        self.dirty = true;
    }

    pub fn push_generated(&mut self, token: Token) {
        self.generated_tokens.push(token);
        self.tokens_stale = true;
        self.arcs_stale = true;
        self.dirty = true;
    }

    pub fn set_generated(&mut self, tokens: Vec<Token>) {
        self.generated_tokens = tokens;
        self.tokens_stale = true;
        self.arcs_stale = true;
        self.dirty = true;
    }

    pub fn set_attention(&mut self, weights: Vec<AttentionWeight>) {
        self.weights = weights;
        self.arcs_stale = true;
        self.dirty = true;
    }

    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.ring_stale = true;
        self.dirty = true;
    }

    pub fn set_status(&mut self, status: GenerationStatus) {
        if self.status != status {
            tracing::debug!("status {} -> {status}", self.status);
            self.status = status;
            self.dirty = true;
        }
    }

    /// Force the next tick to report `needs_redraw` (resize, camera move).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    // --- frame ---

    /// Advance the scene to `now_ms`. The frame delta is clamped to
    /// `max_frame_delta_ms` so a long pause does not teleport tokens.
    pub fn tick(&mut self, now_ms: f64) -> FrameOutput {
        let dt_ms = match self.last_tick_ms {
            Some(last) => (now_ms - last).clamp(0.0, self.config.max_frame_delta_ms),
            None => 0.0,
        };
        self.last_tick_ms = Some(now_ms);
        self.frames += 1;

        if self.tokens_stale {
            self.sync_tokens(now_ms);
        }

        for state in self.states.values_mut() {
            match state.advance(now_ms, dt_ms, &self.config) {
                Some(Transition::EnteredLayer(layer)) => {
                    tracing::debug!("{} entered layer {layer}", state.key);
                    self.events.push(SceneEvent::LayerEntered {
                        token: state.key,
                        layer,
                    });
                    self.scheduler.layer_entered(layer, &mut self.events);
                    bind_layer(
                        &mut self.backend,
                        &mut self.geometries,
                        &mut self.materials,
                        &self.catalog,
                        layer,
                    );
                }
                Some(Transition::Completed) => {
                    tracing::debug!("{} completed", state.key);
                    self.completed += 1;
                    self.events.push(SceneEvent::TokenCompleted { token: state.key });
                }
                Some(_) | None => {}
            }
        }

        let was_attention = self.scheduler.display_phase() == Phase::Attention;
        let layer_changed = self.scheduler.observe(self.states.values(), &mut self.events);
        let phase = self.scheduler.display_phase();
        if phase == Phase::Attention {
            if !was_attention || layer_changed || self.arcs_stale {
                self.rebuild_arcs();
            }
        } else {
            self.hide_arcs();
        }
        self.arcs.fade(dt_ms / 1000.0, phase, self.config.arc_fade_rate);

        self.update_ring();
        self.write_transforms(now_ms);
        let flushed = self.instances.flush();

        let diagnostics = if self.sampler.due(now_ms) {
            let snapshot = self.snapshot(now_ms);
            tracing::info!(
                "diagnostics: frame {}, geometries {}/{} reused, torus {} live ({} evicted), arcs {}/{} ({} dropped)",
                snapshot.frames,
                snapshot.geometries.reused,
                snapshot.geometries.created + snapshot.geometries.reused,
                snapshot.torus.pool.live_count,
                snapshot.torus.evicted,
                snapshot.arcs.occupied,
                snapshot.arcs.capacity,
                snapshot.arcs.dropped
            );
            Some(snapshot)
        } else {
            None
        };

        let animating = self.states.values().any(|s| !s.is_complete);
        let fading = phase == Phase::Attention && self.arcs.is_fading();
        let needs_redraw = self.dirty || animating || fading || flushed;
        self.dirty = false;

        FrameOutput {
            frame: self.frames,
            needs_redraw,
            active_layer: self.scheduler.active_layer(),
            display_phase: phase,
            diagnostics,
        }
    }

    /// Create animation states for newly visible tokens and retire the ones
    /// that fell out of view. Input tokens take the first visible places.
    fn sync_tokens(&mut self, now_ms: f64) {
        self.tokens_stale = false;

        let max = self.config.max_visible_tokens;
        let inputs = self.input_tokens.len().min(max);
        let generated = self.generated_tokens.len().min(max - inputs);
        self.visible_count = inputs + generated;

        let retired: Vec<TokenKey> = self
            .states
            .keys()
            .filter(|key| match key.category {
                TokenCategory::Input => key.position >= inputs,
                TokenCategory::Generated => key.position >= generated,
            })
            .copied()
            .collect();
        for key in retired {
            if let Some(state) = self.states.remove(&key) {
                if state.is_complete {
                    self.completed -= 1;
                }
            }
            self.instances.release(key);
        }

        let keys = (0..inputs)
            .map(TokenKey::input)
            .chain((0..generated).map(TokenKey::generated));
        for (index, key) in keys.enumerate() {
            let x = token_x(index, self.visible_count);
            if let Some(state) = self.states.get_mut(&key) {
                state.retarget_x(x);
                continue;
            }
            if let Err(e) = self.instances.assign(key) {
                tracing::warn!("{key} not drawn: {e}");
                self.events.push(SceneEvent::TokenSkipped { token: key });
                continue;
            }
            self.states.insert(key, TokenAnimationState::new(key, x, now_ms));
        }
    }

    /// Refill the arc pool for the active layer from the current weights.
    fn rebuild_arcs(&mut self) {
        self.arcs_stale = false;
        let layer = self.scheduler.active_layer();

        self.positions.clear();
        self.positions.extend(
            (0..self.visible_count).map(|i| layer_slot(token_x(i, self.visible_count), layer as i32)),
        );
        select_arcs(
            &self.weights,
            layer,
            &self.positions,
            &self.config,
            &mut self.arc_scratch,
        );

        let previous = self.arcs.occupied();
        self.arcs.clear();
        let requested = self.arc_scratch.len();
        let mut allocated = 0;
        for descriptor in self.arc_scratch.drain(..) {
            if self.arcs.allocate(descriptor).is_some() {
                allocated += 1;
            }
        }
        let dropped = requested - allocated;
        if dropped > 0 {
            tracing::warn!(
                "arc pool full: dropped {dropped} of {requested} arcs for layer {layer}"
            );
        }
        if requested > 0 || previous > 0 {
            self.events.push(SceneEvent::ArcsRebuilt {
                layer,
                requested,
                allocated,
                dropped,
            });
        }
    }

    /// Arcs are only drawn during attention; release them as soon as the
    /// display phase moves on. Stale weights are picked up on the next
    /// attention phase.
    fn hide_arcs(&mut self) {
        let occupied = self.arcs.occupied();
        if occupied == 0 {
            return;
        }
        self.arcs.clear();
        tracing::debug!("released {occupied} arcs outside attention");
        self.events.push(SceneEvent::ArcsHidden { released: occupied });
    }

    /// Show the probability ring once the LM head is active and candidates
    /// exist; rebuild it when candidates change, hide it otherwise.
    fn update_ring(&mut self) {
        let visible = self.scheduler.active_layer() >= self.catalog.lm_head()
            && !self.candidates.is_empty();

        if !visible {
            if !self.ring.is_empty() {
                self.release_ring();
                self.events.push(SceneEvent::RingHidden);
            }
            return;
        }
        if !self.ring.is_empty() && !self.ring_stale {
            return;
        }

        self.release_ring();
        self.ring_stale = false;
        compute_ring_segments(
            &self.candidates,
            self.config.ring_radius,
            self.config.top_k,
            &mut self.ring_scratch,
        );

        let radius = self.config.ring_radius;
        let backend = &mut self.backend;
        for segment in self.ring_scratch.drain(..) {
            let torus = self.torus.acquire(segment.arc_angle, |arc| {
                backend.build(&ResourceDesc::Torus {
                    radius,
                    tube: RING_THICKNESS,
                    arc,
                })
            });
            self.ring.push(RingSlice { segment, torus });
        }
        self.events.push(SceneEvent::RingShown {
            segments: self.ring.len(),
        });
    }

    fn release_ring(&mut self) {
        for slice in self.ring.drain(..) {
            self.torus.release(slice.torus);
        }
    }

    fn write_transforms(&mut self, now_ms: f64) {
        let generating = self.status.shows_generating_pulse();
        let generating_pulse =
            1.0 + GENERATING_PULSE_AMPLITUDE * (GENERATING_PULSE_RATE * now_ms).sin();

        for state in self.states.values() {
            let Some(index) = self.instances.index_of(state.key) else {
                continue;
            };
            let pool = self.instances.pool_mut(state.key.category);
            if state.is_complete {
                pool.park(index);
                continue;
            }

            let visual = self.catalog.visual(state.active_layer() as usize);
            let mut scale = visual.instance_scale() * state.pulse_scale(now_ms, &self.config);
            if generating && state.key.category == TokenCategory::Generated {
                scale *= generating_pulse;
                pool.write_glow(
                    index,
                    InstanceTransform::new(state.current_position, scale * GLOW_SCALE),
                );
            } else {
                pool.write_glow(index, InstanceTransform::PARKED);
            }
            pool.write(index, InstanceTransform::new(state.current_position, scale));
        }
    }

    // --- outputs ---

    /// Take the events produced since the last call, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SceneEvent> {
        self.events.drain(..)
    }

    /// Published main-channel transforms of a category, indexed by slot.
    pub fn transforms(&self, category: TokenCategory) -> &[InstanceTransform] {
        self.instances.pool(category).transforms()
    }

    pub fn glow_transforms(&self, category: TokenCategory) -> &[InstanceTransform] {
        self.instances.pool(category).glow_transforms()
    }

    pub fn instances(&self) -> &InstanceSlotPools {
        &self.instances
    }

    pub fn arcs(&self) -> &ArcSlotPool {
        &self.arcs
    }

    pub fn ring(&self) -> &[RingSlice] {
        &self.ring
    }

    /// Label of the layer currently being worked on, if one is shown.
    pub fn label(&self) -> Option<LayerLabel> {
        self.scheduler.label().map(|layer| self.catalog.label(layer))
    }

    pub fn token_state(&self, key: TokenKey) -> Option<&TokenAnimationState> {
        self.states.get(&key)
    }

    pub fn token_states(&self) -> impl Iterator<Item = &TokenAnimationState> {
        self.states.values()
    }

    pub fn token(&self, key: TokenKey) -> Option<&Token> {
        match key.category {
            TokenCategory::Input => self.input_tokens.get(key.position),
            TokenCategory::Generated => self.generated_tokens.get(key.position),
        }
    }

    pub fn active_layer(&self) -> usize {
        self.scheduler.active_layer()
    }

    pub fn display_phase(&self) -> Phase {
        self.scheduler.display_phase()
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    /// Resource behind a handle from any of the scene's pools.
    pub fn resource(&self, handle: ResourceHandle) -> Option<&B::Resource> {
        self.geometries
            .get(handle)
            .or_else(|| self.materials.get(handle))
            .or_else(|| self.torus.resource(handle))
    }

    /// Shared sphere, material and box handles for `layer`.
    pub fn bind_layer(&mut self, layer: usize) -> LayerBinding {
        bind_layer(
            &mut self.backend,
            &mut self.geometries,
            &mut self.materials,
            &self.catalog,
            layer,
        )
    }

    pub fn snapshot(&self, now_ms: f64) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            at_ms: now_ms,
            frames: self.frames,
            geometries: self.geometries.stats(),
            materials: self.materials.stats(),
            torus: self.torus.stats(),
            arcs: self.arcs.stats(),
            instances: self.instances.stats(),
        }
    }

    // --- lifecycle ---

    /// Drop every token and input, recycle all instance and arc slots and
    /// release the ring. Shared geometries and materials stay cached.
    pub fn reset(&mut self) {
        self.instances.clear();
        self.instances.flush();
        self.states.clear();
        self.arcs.clear();
        self.release_ring();
        self.scheduler.reset();

        self.input_tokens.clear();
        self.generated_tokens.clear();
        self.weights.clear();
        self.candidates.clear();
        self.status = GenerationStatus::Idle;
        self.events.clear();

        self.visible_count = 0;
        self.tokens_stale = false;
        self.arcs_stale = false;
        self.ring_stale = false;
        self.last_tick_ms = None;
        self.completed = 0;
        self.dirty = true;
        tracing::debug!("scene reset");
    }

    /// Release pools, then dispose the torus pool and both registries.
    /// Disposal failures are logged and counted, never raised.
    pub fn teardown(mut self) -> TeardownReport {
        self.instances.clear();
        self.arcs.clear();
        self.release_ring();

        let report = TeardownReport {
            frames: self.frames,
            torus: self.torus.dispose(),
            geometries: self.geometries.dispose_all(),
            materials: self.materials.dispose_all(),
        };
        tracing::info!(
            "scene teardown after {} frames: {} resources disposed, {} failed",
            report.frames,
            report.disposed(),
            report.failed()
        );
        report
    }
}

fn bind_layer<B: RenderBackend>(
    backend: &mut B,
    geometries: &mut GeometryRegistry<B::Resource>,
    materials: &mut GeometryRegistry<B::Resource>,
    catalog: &LayerCatalog,
    layer: usize,
) -> LayerBinding {
    let (sphere_key, sphere_desc) = catalog.sphere(layer);
    let (material_key, material_desc) = catalog.material(layer);
    LayerBinding {
        sphere: geometries.get_or_create(&sphere_key, || backend.build(&sphere_desc)),
        material: materials.get_or_create(&material_key, || backend.build(&material_desc)),
        layer_box: geometries.get_or_create(LAYER_BOX_KEY, || {
            backend.build(&ResourceDesc::Box {
                width: LAYER_BOX_WIDTH,
                height: LAYER_HEIGHT,
                depth: LAYER_BOX_DEPTH,
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::HeadlessBackend;

    const DT: f64 = 1000.0 / 60.0;

    fn tokens(n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::new(i as u32 + 100, format!("t{i}"), i)).collect()
    }

    fn scene() -> Scene<HeadlessBackend> {
        Scene::new(SceneConfig::default(), HeadlessBackend::new()).unwrap()
    }

    /// Tick at 60 Hz until the scene goes idle. Returns the time reached.
    fn run_until_idle(scene: &mut Scene<HeadlessBackend>, mut now: f64) -> f64 {
        for _ in 0..10_000 {
            now += DT;
            if !scene.tick(now).needs_redraw {
                return now;
            }
        }
        panic!("scene never went idle");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = SceneConfig {
            max_tokens: 0,
            ..SceneConfig::default()
        };
        assert!(Scene::new(cfg, HeadlessBackend::new()).is_err());
    }

    #[test]
    fn test_empty_scene_goes_idle() {
        let mut scene = scene();
        assert!(scene.tick(0.0).needs_redraw, "first frame is dirty");
        assert!(!scene.tick(DT).needs_redraw);
        assert!(scene.arcs().occupied() == 0 && scene.ring().is_empty());
    }

    #[test]
    fn test_invalidate_forces_redraw() {
        let mut scene = scene();
        scene.tick(0.0);
        scene.tick(DT);
        scene.invalidate();
        assert!(scene.tick(2.0 * DT).needs_redraw);
        assert!(!scene.tick(3.0 * DT).needs_redraw);
    }

    #[test]
    fn test_tokens_get_instances_and_complete() {
        let mut scene = scene();
        scene.set_tokens(tokens(3));
        scene.tick(0.0);
        assert_eq!(scene.instances().pool(TokenCategory::Input).live(), 3);

        run_until_idle(&mut scene, 0.0);
        assert_eq!(scene.completed(), 3);
        assert!(scene.token_states().all(|s| s.is_complete));
        assert!(
            scene.transforms(TokenCategory::Input).iter().all(|t| t.is_parked()),
            "completed tokens are parked"
        );
        assert_eq!(scene.instances().pool(TokenCategory::Input).live(), 3, "slots kept");
    }

    #[test]
    fn test_visible_cap_input_first() {
        let cfg = SceneConfig {
            max_visible_tokens: 4,
            ..SceneConfig::default()
        };
        let mut scene = Scene::new(cfg, HeadlessBackend::new()).unwrap();
        scene.set_tokens(tokens(3));
        scene.set_generated(tokens(3));
        scene.tick(0.0);

        assert_eq!(scene.token_states().count(), 4);
        assert!(scene.token_state(TokenKey::input(2)).is_some());
        assert!(scene.token_state(TokenKey::generated(0)).is_some());
        assert!(scene.token_state(TokenKey::generated(1)).is_none());
    }

    #[test]
    fn test_row_recentres_when_tokens_added() {
        let mut scene = scene();
        scene.set_tokens(tokens(2));
        scene.tick(0.0);
        let before = scene.token_state(TokenKey::input(0)).unwrap().target_position.x;

        scene.push_generated(Token::new(7, "x", 0));
        scene.tick(DT);
        let after = scene.token_state(TokenKey::input(0)).unwrap().target_position.x;
        assert!((before - token_x(0, 2)).abs() < 1e-12);
        assert!((after - token_x(0, 3)).abs() < 1e-12);
    }

    #[test]
    fn test_exhausted_pool_skips_token() {
        let cfg = SceneConfig {
            max_tokens: 2,
            ..SceneConfig::default()
        };
        let mut scene = Scene::new(cfg, HeadlessBackend::new()).unwrap();
        scene.set_tokens(tokens(3));
        scene.tick(0.0);

        assert_eq!(scene.token_states().count(), 2);
        let events: Vec<_> = scene.drain_events().collect();
        assert!(events.contains(&SceneEvent::TokenSkipped {
            token: TokenKey::input(2)
        }));
    }

    #[test]
    fn test_frame_delta_clamped() {
        let mut scene = scene();
        scene.set_tokens(tokens(1));
        scene.tick(0.0);
        scene.tick(60_000.0);

        let state = scene.token_state(TokenKey::input(0)).unwrap();
        let alpha = 1.0 - (-scene.config().lerp_rate * 0.1).exp();
        let expected = crate::layout::spawn_position(state.target_position.x)
            .lerp(state.target_position, alpha);
        assert!((state.current_position.y - expected.y).abs() < 1e-9);
    }

    #[test]
    fn test_layers_share_registry_entries() {
        let mut scene = scene();
        scene.set_tokens(tokens(4));
        run_until_idle(&mut scene, 0.0);

        let snapshot = scene.snapshot(0.0);
        // layer box plus one sphere per layer
        assert_eq!(snapshot.geometries.created, 1 + scene.catalog().len() as u64);
        assert_eq!(snapshot.materials.created, scene.catalog().len() as u64);
        assert!(snapshot.geometries.reused >= 3 * 5);

        let a = scene.bind_layer(2);
        let b = scene.bind_layer(2);
        assert_eq!(a, b);
        assert!(scene.resource(a.sphere).is_some());
    }

    #[test]
    fn test_generating_glow_only_while_inferring() {
        let mut scene = scene();
        scene.set_generated(tokens(1));
        scene.set_status(GenerationStatus::Inferring);
        scene.tick(0.0);
        scene.tick(DT);
        let glow = scene.glow_transforms(TokenCategory::Generated)[0];
        let main = scene.transforms(TokenCategory::Generated)[0];
        assert!(!glow.is_parked());
        assert!((glow.scale - main.scale * GLOW_SCALE).abs() < 1e-12);

        scene.set_status(GenerationStatus::Complete);
        scene.tick(2.0 * DT);
        assert!(scene.glow_transforms(TokenCategory::Generated)[0].is_parked());
    }

    #[test]
    fn test_ring_follows_candidates() {
        let mut scene = scene();
        scene.set_tokens(tokens(2));
        scene.set_candidates(vec![Candidate::new("a", 0.6, 1), Candidate::new("b", 0.4, 2)]);
        scene.tick(0.0);
        assert!(scene.ring().is_empty(), "ring waits for the LM head");

        let now = run_until_idle(&mut scene, 0.0);
        assert_eq!(scene.ring().len(), 2);
        let first = scene.ring()[0].torus;
        assert!(scene.resource(first).is_some());

        scene.set_candidates(vec![Candidate::new("c", 0.6, 3), Candidate::new("d", 0.4, 4)]);
        scene.tick(now + DT);
        assert_eq!(scene.ring()[0].segment.token, "c");
        assert_eq!(scene.ring()[0].torus, first, "same angle bucket reuses the torus");

        scene.set_candidates(Vec::new());
        scene.tick(now + 2.0 * DT);
        assert!(scene.ring().is_empty());
        let events: Vec<_> = scene.drain_events().collect();
        assert!(events.contains(&SceneEvent::RingHidden));
        assert_eq!(scene.snapshot(now).torus.in_use, 0);
    }

    #[test]
    fn test_label_follows_entered_layer() {
        let mut scene = scene();
        scene.set_tokens(tokens(1));
        let mut now = 0.0;
        while scene.label().is_none() {
            now += DT;
            scene.tick(now);
            assert!(now < 10_000.0);
        }
        let label = scene.label().unwrap();
        assert_eq!(label.layer, 0);
        assert_eq!(label.name, "Embedding Layer");
    }

    #[test]
    fn test_reset_recycles_everything() {
        let mut scene = scene();
        scene.set_tokens(tokens(5));
        scene.set_candidates(vec![Candidate::new("a", 1.0, 1)]);
        let now = run_until_idle(&mut scene, 0.0);
        assert!(!scene.ring().is_empty());

        scene.reset();
        assert_eq!(scene.token_states().count(), 0);
        assert!(scene.ring().is_empty());
        assert_eq!(scene.arcs().occupied(), 0);
        assert!(scene.instances().stats().iter().all(|s| s.live == 0));
        assert!(scene.transforms(TokenCategory::Input).iter().all(|t| t.is_parked()));
        assert_eq!(scene.active_layer(), 0);

        scene.set_tokens(tokens(2));
        scene.tick(now);
        assert_eq!(scene.instances().index_of(TokenKey::input(1)), Some(1));
    }

    #[test]
    fn test_teardown_disposes_all() {
        let mut scene = scene();
        scene.set_tokens(tokens(2));
        scene.set_candidates(vec![Candidate::new("a", 0.5, 1), Candidate::new("b", 0.5, 2)]);
        run_until_idle(&mut scene, 0.0);

        let report = scene.teardown();
        // layer box + 5 spheres, 5 materials, one torus per half
        assert_eq!(report.geometries.disposed, 6);
        assert_eq!(report.materials.disposed, 5);
        assert_eq!(report.torus.disposed, 2);
        assert_eq!(report.total(), DisposeReport { disposed: 13, failed: 0 });
    }

    #[test]
    fn test_diagnostics_sampled_on_interval() {
        let mut scene = scene();
        assert!(scene.tick(0.0).diagnostics.is_some());
        assert!(scene.tick(DT).diagnostics.is_none());
        assert!(scene.tick(5000.0).diagnostics.is_some());
    }
}
