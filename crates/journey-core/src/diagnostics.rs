//! Operational counters for the pools, sampled at a fixed interval.
//! A development aid: nothing in the engine reads these back.

use serde::Serialize;

use crate::arc::ArcPoolStats;
use crate::instance::InstancePoolStats;

/// Creation/reuse counters of a keyed or bucketed pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub live_count: usize,
    pub reuse_rate: f64,
}

impl PoolStats {
    pub fn new(created: u64, reused: u64, live_count: usize) -> Self {
        let requests = created + reused;
        let reuse_rate = if requests == 0 {
            0.0
        } else {
            reused as f64 / requests as f64
        };
        Self {
            created,
            reused,
            live_count,
            reuse_rate,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TorusStats {
    #[serde(flatten)]
    pub pool: PoolStats,
    pub in_use: usize,
    pub evicted: u64,
}

/// Everything a scene reports about its pools at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticSnapshot {
    pub at_ms: f64,
    pub frames: u64,
    pub geometries: PoolStats,
    pub materials: PoolStats,
    pub torus: TorusStats,
    pub arcs: ArcPoolStats,
    pub instances: Vec<InstancePoolStats>,
}

/// Decides when the next snapshot is due.
#[derive(Clone, Debug)]
pub struct DiagnosticSampler {
    interval_ms: f64,
    last_sample_ms: Option<f64>,
}

impl DiagnosticSampler {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_sample_ms: None,
        }
    }

    /// True (and the clock is restarted) when `interval_ms` has passed since
    /// the last sample. The first call is always due.
    pub fn due(&mut self, now_ms: f64) -> bool {
        match self.last_sample_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_sample_ms = Some(now_ms);
                true
            }
        }
    }
}
