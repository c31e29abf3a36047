use std::collections::HashMap;

use crate::diagnostics::PoolStats;
use crate::resource::{Disposable, DisposeReport, ResourceHandle};

struct Entry<R> {
    handle: ResourceHandle,
    resource: R,
    reused: u64,
}

/// Keyed cache of shared, immutable resources.
///
/// One sphere shape can back hundreds of token instances: the first request
/// for a key builds it, every later request gets the same handle back.
/// Resources live until [`dispose_all`](Self::dispose_all); there is no
/// per-borrower release. The scene owns one registry per resource family and
/// passes it to whoever needs it.
pub struct GeometryRegistry<R> {
    entries: HashMap<String, Entry<R>>,
    keys_by_handle: HashMap<ResourceHandle, String>,
    created: u64,
    reused: u64,
}

impl<R: Disposable> GeometryRegistry<R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            keys_by_handle: HashMap::new(),
            created: 0,
            reused: 0,
        }
    }

    /// Handle for `key`, building the resource with `factory` on first use.
    pub fn get_or_create(&mut self, key: &str, factory: impl FnOnce() -> R) -> ResourceHandle {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.reused += 1;
            self.reused += 1;
            return entry.handle;
        }

        let handle = ResourceHandle::new();
        self.entries.insert(
            key.to_string(),
            Entry {
                handle,
                resource: factory(),
                reused: 0,
            },
        );
        self.keys_by_handle.insert(handle, key.to_string());
        self.created += 1;
        tracing::debug!("registry: created '{key}'");
        handle
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&R> {
        let key = self.keys_by_handle.get(&handle)?;
        self.entries.get(key).map(|e| &e.resource)
    }

    pub fn handle_for(&self, key: &str) -> Option<ResourceHandle> {
        self.entries.get(key).map(|e| e.handle)
    }

    /// How many times `key` was served from cache.
    pub fn reuse_count(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.reused)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats::new(self.created, self.reused, self.entries.len())
    }

    /// Dispose every cached resource and empty the cache.
    ///
    /// Must run after the last tick that could bind one of the handles.
    /// Backend failures are logged and counted; disposal always completes.
    pub fn dispose_all(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        for (key, mut entry) in self.entries.drain() {
            report.record(&format!("registry '{key}'"), &mut entry.resource);
        }
        self.keys_by_handle.clear();
        report
    }
}

impl<R: Disposable> Default for GeometryRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
