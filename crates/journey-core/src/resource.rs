//! Resource descriptors and the seam to the host renderer.
//!
//! The engine never touches a graphics API. It describes the shapes and
//! materials it needs with [`ResourceDesc`], asks a [`RenderBackend`] to build
//! them, and hands the host opaque [`ResourceHandle`]s to bind at draw time.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DisposeError;

/// Opaque identity of a pooled resource. Unique across all pools of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(Uuid);

impl ResourceHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub color: String,
    pub emissive: String,
    pub emissive_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
    pub opacity: f64,
}

impl MaterialDesc {
    /// Standard lit material glowing in its own color.
    pub fn glowing(color: &str, emissive_intensity: f64) -> Self {
        Self {
            color: color.to_string(),
            emissive: color.to_string(),
            emissive_intensity,
            metalness: 0.3,
            roughness: 0.4,
            opacity: 1.0,
        }
    }
}

/// Everything the engine can ask a backend to build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceDesc {
    Sphere { radius: f64, segments: u32 },
    Box { width: f64, height: f64, depth: f64 },
    Plane { width: f64, height: f64 },
    /// Partial torus spanning `arc` radians.
    Torus { radius: f64, tube: f64, arc: f64 },
    Material(MaterialDesc),
}

/// A backend-owned resource that must be released explicitly.
pub trait Disposable {
    fn dispose(&mut self) -> Result<(), DisposeError>;
}

/// Host renderer integration point.
pub trait RenderBackend {
    type Resource: Disposable;

    fn build(&mut self, desc: &ResourceDesc) -> Self::Resource;
}

/// Outcome of a bulk disposal. Failures are logged and counted, never raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisposeReport {
    pub disposed: usize,
    pub failed: usize,
}

impl DisposeReport {
    /// Dispose one resource, recording the outcome.
    pub fn record(&mut self, label: &str, resource: &mut impl Disposable) {
        match resource.dispose() {
            Ok(()) => self.disposed += 1,
            Err(e) => {
                tracing::warn!("{label}: {e}");
                self.failed += 1;
            }
        }
    }

    pub fn merge(&mut self, other: DisposeReport) {
        self.disposed += other.disposed;
        self.failed += other.failed;
    }
}

/// Resource record produced by [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessResource {
    pub desc: ResourceDesc,
    pub disposed: bool,
    fail_dispose: bool,
}

impl Disposable for HeadlessResource {
    fn dispose(&mut self) -> Result<(), DisposeError> {
        if self.fail_dispose {
            return Err(DisposeError::new(
                format!("{:?}", self.desc),
                "backend refused release",
            ));
        }
        if self.disposed {
            return Err(DisposeError::new(format!("{:?}", self.desc), "already disposed"));
        }
        self.disposed = true;
        Ok(())
    }
}

/// Backend that keeps descriptors only. Drives the engine without a GPU
/// (CLI simulation, tests, benches).
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    built: usize,
    fail_dispose: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose resources all fail to dispose.
    pub fn with_failing_disposal() -> Self {
        Self {
            built: 0,
            fail_dispose: true,
        }
    }

    /// Number of resources built so far.
    pub fn built(&self) -> usize {
        self.built
    }
}

impl RenderBackend for HeadlessBackend {
    type Resource = HeadlessResource;

    fn build(&mut self, desc: &ResourceDesc) -> HeadlessResource {
        self.built += 1;
        HeadlessResource {
            desc: desc.clone(),
            disposed: false,
            fail_dispose: self.fail_dispose,
        }
    }
}
