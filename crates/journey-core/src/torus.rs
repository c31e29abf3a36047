//! Pool of partial-torus resources for probability ring segments.
//!
//! Ring arcs are continuous values that rarely repeat exactly, so entries are
//! matched by angle bucket (0.01 rad) instead of by exact key. Free entries are
//! kept for reuse; once the pool reaches its maximum size the free entry that
//! was released longest ago is evicted.

use std::collections::{BTreeMap, HashMap};

use crate::constants::ANGLE_QUANTUM;
use crate::diagnostics::{PoolStats, TorusStats};
use crate::resource::{Disposable, DisposeReport, ResourceHandle};

/// Bucket index of `angle` at 0.01 rad resolution.
pub fn quantize_angle(angle: f64) -> i64 {
    (angle / ANGLE_QUANTUM).round() as i64
}

/// Representative angle of a bucket.
pub fn bucket_angle(bucket: i64) -> f64 {
    bucket as f64 * ANGLE_QUANTUM
}

struct TorusEntry<R> {
    bucket: i64,
    resource: R,
    in_use: bool,
    last_released: u64,
}

pub struct TorusPool<R> {
    entries: HashMap<ResourceHandle, TorusEntry<R>>,
    free: HashMap<i64, Vec<ResourceHandle>>,
    /// Free entries by release stamp, oldest first.
    released: BTreeMap<u64, ResourceHandle>,
    max_entries: usize,
    release_clock: u64,
    created: u64,
    reused: u64,
    evicted: u64,
}

impl<R: Disposable> TorusPool<R> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            free: HashMap::new(),
            released: BTreeMap::new(),
            max_entries: max_entries.max(1),
            release_clock: 0,
            created: 0,
            reused: 0,
            evicted: 0,
        }
    }

    /// Acquire a resource for `angle`. A free entry in the same bucket is
    /// reused; otherwise `build` is called with the bucket's angle.
    ///
    /// Matching is by bucket, not by distance: angles within 0.005 rad of the
    /// same multiple of 0.01 always share an entry, but two angles on either
    /// side of a bucket edge (1.2249 and 1.2251) get separate entries even
    /// though they are closer than 0.01.
    pub fn acquire(&mut self, angle: f64, build: impl FnOnce(f64) -> R) -> ResourceHandle {
        let bucket = quantize_angle(angle);

        if let Some(handle) = self.take_free(bucket) {
            if let Some(entry) = self.entries.get_mut(&handle) {
                entry.in_use = true;
                self.released.remove(&entry.last_released);
            }
            self.reused += 1;
            return handle;
        }

        if self.entries.len() >= self.max_entries {
            self.evict_lru();
        }

        let handle = ResourceHandle::new();
        self.entries.insert(
            handle,
            TorusEntry {
                bucket,
                resource: build(bucket_angle(bucket)),
                in_use: true,
                last_released: 0,
            },
        );
        self.created += 1;
        if self.entries.len() > self.max_entries {
            tracing::debug!(
                "torus pool over capacity: {} entries, all in use",
                self.entries.len()
            );
        }
        handle
    }

    /// Return a resource to the pool. Unknown or already-free handles are
    /// ignored. Returns whether the handle was in use.
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return false;
        };
        if !entry.in_use {
            return false;
        }

        self.release_clock += 1;
        entry.in_use = false;
        entry.last_released = self.release_clock;
        self.free.entry(entry.bucket).or_default().push(handle);
        self.released.insert(self.release_clock, handle);

        // Shrink back after an all-in-use overflow
        while self.entries.len() > self.max_entries {
            if !self.evict_lru() {
                break;
            }
        }
        true
    }

    pub fn resource(&self, handle: ResourceHandle) -> Option<&R> {
        self.entries.get(&handle).map(|e| &e.resource)
    }

    /// Quantized arc angle the handle was built for.
    pub fn angle(&self, handle: ResourceHandle) -> Option<f64> {
        self.entries.get(&handle).map(|e| bucket_angle(e.bucket))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_use(&self) -> usize {
        self.entries.values().filter(|e| e.in_use).count()
    }

    pub fn stats(&self) -> TorusStats {
        TorusStats {
            pool: PoolStats::new(self.created, self.reused, self.entries.len()),
            in_use: self.in_use(),
            evicted: self.evicted,
        }
    }

    /// Dispose every entry, in use or not, and empty the pool.
    pub fn dispose(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        for (handle, mut entry) in self.entries.drain() {
            report.record(&format!("torus {handle}"), &mut entry.resource);
        }
        self.free.clear();
        self.released.clear();
        report
    }

    fn take_free(&mut self, bucket: i64) -> Option<ResourceHandle> {
        let handles = self.free.get_mut(&bucket)?;
        let handle = handles.pop();
        if handles.is_empty() {
            self.free.remove(&bucket);
        }
        handle
    }

    /// Drop the least recently released free entry. Returns false when
    /// every entry is in use.
    fn evict_lru(&mut self) -> bool {
        let Some((_, handle)) = self.released.pop_first() else {
            return false;
        };
        let Some(mut entry) = self.entries.remove(&handle) else {
            return false;
        };

        if let Some(handles) = self.free.get_mut(&entry.bucket) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.free.remove(&entry.bucket);
            }
        }
        let mut report = DisposeReport::default();
        report.record(&format!("torus {handle}"), &mut entry.resource);
        self.evicted += 1;
        true
    }
}
