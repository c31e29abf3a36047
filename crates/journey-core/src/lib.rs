//! Token journey scene engine.
//!
//! Animates tokens through the layers of a transformer (embedding, blocks,
//! LM head): each token moves into a layer, attends, runs its feed-forward
//! pulse and moves on. Attention arcs, instance slots, ring segments and
//! shared geometries live in bounded, reusable pools so a long session never
//! grows without limit.
//!
//! Zero I/O: the host renderer plugs in through [`RenderBackend`] and drives
//! [`Scene::tick`] from its frame loop.

pub mod arc;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod instance;
pub mod layout;
pub mod mock;
pub mod registry;
pub mod resource;
pub mod ring;
pub mod scene;
pub mod scheduler;
pub mod token;
pub mod token_state;
pub mod torus;
pub mod vec3;

pub use arc::{ArcDescriptor, ArcPoolStats, ArcSlot, ArcSlotPool, compute_arc, select_arcs};
pub use config::SceneConfig;
pub use diagnostics::{DiagnosticSampler, DiagnosticSnapshot, PoolStats, TorusStats};
pub use error::{DisposeError, EngineError, Result};
pub use events::SceneEvent;
pub use instance::{InstancePool, InstancePoolStats, InstanceSlotPools, InstanceTransform};
pub use layout::{LayerCatalog, LayerLabel, LayerVisual, layer_slot, layer_y, token_x};
pub use registry::GeometryRegistry;
pub use resource::{
    Disposable, DisposeReport, HeadlessBackend, HeadlessResource, MaterialDesc, RenderBackend,
    ResourceDesc, ResourceHandle,
};
pub use ring::{RingSegment, compute_ring_segments};
pub use scene::{FrameOutput, LayerBinding, RingSlice, Scene, TeardownReport};
pub use scheduler::LayerScheduler;
pub use token::{
    AttentionWeight, Candidate, GenerationStatus, Token, TokenCategory, TokenKey,
};
pub use token_state::{Phase, TokenAnimationState, Transition};
pub use torus::{TorusPool, bucket_angle, quantize_angle};
pub use vec3::Vec3;
