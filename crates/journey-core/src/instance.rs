//! Instanced-draw slot pools, one per token category.
//!
//! Every token sphere of a category is one instance in a shared buffer of
//! fixed capacity. A token owns its index from assignment until release;
//! freed indices are recycled lowest-first before the high-water mark grows.
//! Transform writes go to a staging buffer that `flush` publishes once per
//! frame.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::constants::PARKED_Y;
use crate::error::{EngineError, Result};
use crate::token::{TokenCategory, TokenKey};
use crate::vec3::Vec3;

/// Position and uniform scale of one instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub scale: f64,
}

impl InstanceTransform {
    /// Off-screen and zero-sized. Every slot starts here.
    pub const PARKED: Self = Self {
        position: Vec3::new(0.0, PARKED_Y, 0.0),
        scale: 0.0,
    };

    pub fn new(position: Vec3, scale: f64) -> Self {
        Self { position, scale }
    }

    pub fn is_parked(&self) -> bool {
        self.scale == 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InstancePoolStats {
    pub category: TokenCategory,
    pub capacity: usize,
    pub live: usize,
    pub high_water: usize,
}

pub struct InstancePool {
    category: TokenCategory,
    staged_main: Vec<InstanceTransform>,
    staged_glow: Vec<InstanceTransform>,
    main: Vec<InstanceTransform>,
    glow: Vec<InstanceTransform>,
    recycled: BTreeSet<usize>,
    high_water: usize,
    assigned: HashMap<TokenKey, usize>,
    dirty: bool,
}

impl InstancePool {
    pub fn new(category: TokenCategory, capacity: usize) -> Self {
        let parked = vec![InstanceTransform::PARKED; capacity];
        Self {
            category,
            staged_main: parked.clone(),
            staged_glow: parked.clone(),
            main: parked.clone(),
            glow: parked,
            recycled: BTreeSet::new(),
            high_water: 0,
            assigned: HashMap::new(),
            dirty: false,
        }
    }

    pub fn category(&self) -> TokenCategory {
        self.category
    }

    pub fn capacity(&self) -> usize {
        self.main.len()
    }

    pub fn live(&self) -> usize {
        self.assigned.len()
    }

    pub fn index_of(&self, key: TokenKey) -> Option<usize> {
        self.assigned.get(&key).copied()
    }

    /// Index for `key`, assigning one if it has none yet.
    pub fn assign(&mut self, key: TokenKey) -> Result<usize> {
        if let Some(index) = self.assigned.get(&key) {
            return Ok(*index);
        }

        let index = if let Some(index) = self.recycled.pop_first() {
            index
        } else if self.high_water < self.capacity() {
            self.high_water += 1;
            self.high_water - 1
        } else {
            return Err(EngineError::PoolExhausted {
                category: self.category,
                capacity: self.capacity(),
            });
        };

        self.assigned.insert(key, index);
        Ok(index)
    }

    /// Park `key`'s slot and recycle its index.
    pub fn release(&mut self, key: TokenKey) -> Option<usize> {
        let index = self.assigned.remove(&key)?;
        self.park(index);
        self.recycled.insert(index);
        Some(index)
    }

    /// Release every assigned slot.
    pub fn clear(&mut self) {
        let keys: Vec<TokenKey> = self.assigned.keys().copied().collect();
        for key in keys {
            self.release(key);
        }
    }

    pub fn write(&mut self, index: usize, transform: InstanceTransform) {
        if let Some(slot) = self.staged_main.get_mut(index) {
            if *slot != transform {
                *slot = transform;
                self.dirty = true;
            }
        }
    }

    pub fn write_glow(&mut self, index: usize, transform: InstanceTransform) {
        if let Some(slot) = self.staged_glow.get_mut(index) {
            if *slot != transform {
                *slot = transform;
                self.dirty = true;
            }
        }
    }

    /// Hide both channels of a slot without releasing it.
    pub fn park(&mut self, index: usize) {
        self.write(index, InstanceTransform::PARKED);
        self.write_glow(index, InstanceTransform::PARKED);
    }

    /// Publish staged writes. Returns whether anything changed since the
    /// previous flush.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.main.copy_from_slice(&self.staged_main);
        self.glow.copy_from_slice(&self.staged_glow);
        self.dirty = false;
        true
    }

    /// Published main-channel transforms, indexed by slot.
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.main
    }

    /// Published glow-channel transforms, indexed by slot.
    pub fn glow_transforms(&self) -> &[InstanceTransform] {
        &self.glow
    }

    pub fn stats(&self) -> InstancePoolStats {
        InstancePoolStats {
            category: self.category,
            capacity: self.capacity(),
            live: self.live(),
            high_water: self.high_water,
        }
    }
}

/// The input and generated pools of a scene.
pub struct InstanceSlotPools {
    input: InstancePool,
    generated: InstancePool,
}

impl InstanceSlotPools {
    pub fn new(capacity: usize) -> Self {
        Self {
            input: InstancePool::new(TokenCategory::Input, capacity),
            generated: InstancePool::new(TokenCategory::Generated, capacity),
        }
    }

    pub fn pool(&self, category: TokenCategory) -> &InstancePool {
        match category {
            TokenCategory::Input => &self.input,
            TokenCategory::Generated => &self.generated,
        }
    }

    pub fn pool_mut(&mut self, category: TokenCategory) -> &mut InstancePool {
        match category {
            TokenCategory::Input => &mut self.input,
            TokenCategory::Generated => &mut self.generated,
        }
    }

    pub fn assign(&mut self, key: TokenKey) -> Result<usize> {
        self.pool_mut(key.category).assign(key)
    }

    pub fn release(&mut self, key: TokenKey) -> Option<usize> {
        self.pool_mut(key.category).release(key)
    }

    pub fn index_of(&self, key: TokenKey) -> Option<usize> {
        self.pool(key.category).index_of(key)
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.generated.clear();
    }

    /// Flush both pools. True when either published new transforms.
    pub fn flush(&mut self) -> bool {
        let input = self.input.flush();
        let generated = self.generated.flush();
        input || generated
    }

    pub fn stats(&self) -> Vec<InstancePoolStats> {
        vec![self.input.stats(), self.generated.stats()]
    }
}
