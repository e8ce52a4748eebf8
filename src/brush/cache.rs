//! Scaled-mask cache
//!
//! Keyed by (brush type, pixel size, rotation bucket). When an entry cap or
//! byte budget is configured, least-recently-used entries are evicted on
//! insert until both hold. The entry just inserted is always kept.

use std::collections::HashMap;
use std::sync::Arc;

use super::{BrushType, ScaledMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey {
    pub brush: BrushType,
    pub size_px: u32,
    pub angle_bucket: u32,
}

#[derive(Debug)]
struct CacheEntry {
    mask: Arc<ScaledMask>,
    last_used: u64,
}

#[derive(Debug, Default)]
pub struct MaskCache {
    entries: HashMap<MaskKey, CacheEntry>,
    capacity: Option<usize>,
    max_bytes: Option<usize>,
    bytes: usize,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl MaskCache {
    pub fn new(capacity: Option<usize>, max_bytes: Option<usize>) -> Self {
        Self {
            capacity,
            max_bytes,
            ..Self::default()
        }
    }

    /// Look up a mask, marking it as recently used
    pub fn get(&mut self, key: &MaskKey) -> Option<Arc<ScaledMask>> {
        self.tick += 1;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = self.tick;
                self.hits += 1;
                Some(Arc::clone(&entry.mask))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: MaskKey, mask: Arc<ScaledMask>) {
        self.tick += 1;
        self.bytes += mask.byte_size();
        let replaced = self.entries.insert(
            key,
            CacheEntry {
                mask,
                last_used: self.tick,
            },
        );
        if let Some(old) = replaced {
            self.bytes -= old.mask.byte_size();
        }
        while self.entries.len() > 1 && self.over_budget() {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn over_budget(&self) -> bool {
        self.capacity.is_some_and(|cap| self.entries.len() > cap)
            || self.max_bytes.is_some_and(|max| self.bytes > max)
    }

    fn evict_lru(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| *k);
        let Some(key) = oldest else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.bytes -= entry.mask.byte_size();
            tracing::debug!("Evicted scaled mask {:?}", key);
        }
        true
    }

    /// Drop every entry derived from `brush`
    pub fn remove_brush(&mut self, brush: BrushType) {
        self.entries.retain(|k, _| k.brush != brush);
        self.bytes = self.entries.values().map(|e| e.mask.byte_size()).sum();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held by cached masks
    pub fn total_size(&self) -> usize {
        self.bytes
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
