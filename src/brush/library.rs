//! Brush mask library - base masks per brush type plus the scaled-mask cache

use parking_lot::Mutex;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

use super::cache::{MaskCache, MaskKey};
use super::mask::{BrushMask, ScaledMask, BASE_MASK_SIZE};
use super::BrushType;
use crate::config::MaskCacheConfig;
use crate::error::{InkError, InkResult};

#[derive(Debug)]
pub struct BrushMaskLibrary {
    masks: HashMap<BrushType, Arc<BrushMask>>,
    cache: Mutex<MaskCache>,
    bucket_degrees: f32,
}

impl BrushMaskLibrary {
    /// Empty library; every brush type is unavailable until loaded
    pub fn new(config: &MaskCacheConfig) -> Self {
        Self {
            masks: HashMap::new(),
            cache: Mutex::new(MaskCache::new(config.capacity, config.max_bytes)),
            bucket_degrees: config.rotation_bucket_degrees.max(0.1),
        }
    }

    /// Library with the procedural round and flat shapes
    pub fn builtin(config: &MaskCacheConfig) -> Self {
        Self::new(config).with_fallbacks()
    }

    /// Load `brush_<type>.png` for every brush type from `dir`. Types whose
    /// asset fails stay unavailable; their errors are returned alongside.
    pub fn load_dir(dir: &Path, config: &MaskCacheConfig) -> (Self, Vec<InkError>) {
        let mut library = Self::new(config);
        let mut errors = Vec::new();
        for brush in BrushType::ALL {
            let path = dir.join(brush.asset_file_name());
            if let Err(e) = library.load_asset(brush, &path) {
                tracing::warn!("Brush '{}' disabled: {}", brush, e);
                errors.push(e);
            }
        }
        tracing::info!(
            "Loaded brush masks from {:?}: {:?}",
            dir,
            library.available_types()
        );
        (library, errors)
    }

    /// Synthesize a built-in shape for every brush type that has no mask
    pub fn with_fallbacks(mut self) -> Self {
        for brush in BrushType::ALL {
            if !self.masks.contains_key(&brush) {
                tracing::debug!("Synthesizing built-in '{}' mask", brush);
                self.insert(brush, BrushMask::synthesize(brush, BASE_MASK_SIZE));
            }
        }
        self
    }

    pub fn load_asset(&mut self, brush: BrushType, path: &Path) -> InkResult<()> {
        if !path.exists() {
            return Err(InkError::asset(brush, format!("missing file {:?}", path)));
        }
        let bytes = std::fs::read(path).map_err(|e| InkError::asset(brush, e.to_string()))?;
        self.load_asset_bytes(brush, &bytes)
    }

    pub fn load_asset_bytes(&mut self, brush: BrushType, bytes: &[u8]) -> InkResult<()> {
        let mask = BrushMask::decode(brush, bytes)?;
        tracing::debug!("Brush '{}' mask loaded at {}px", brush, mask.size());
        self.insert(brush, mask);
        Ok(())
    }

    /// Install a base mask, invalidating anything cached from the old one
    pub fn insert(&mut self, brush: BrushType, mask: BrushMask) {
        self.masks.insert(brush, Arc::new(mask));
        self.cache.lock().remove_brush(brush);
    }

    pub fn is_available(&self, brush: BrushType) -> bool {
        self.masks.contains_key(&brush)
    }

    pub fn available_types(&self) -> Vec<BrushType> {
        BrushType::ALL
            .into_iter()
            .filter(|b| self.masks.contains_key(b))
            .collect()
    }

    /// Scaled and rotated mask for one stamp. Rotation is snapped to the
    /// configured angular bucket so nearby angles share a cache entry.
    pub fn get_mask(
        &self,
        brush: BrushType,
        target_size_px: f32,
        rotation_radians: f32,
    ) -> InkResult<Arc<ScaledMask>> {
        let base = self
            .masks
            .get(&brush)
            .ok_or_else(|| InkError::asset(brush, "no mask loaded"))?;

        let size_px = if target_size_px.is_finite() {
            target_size_px.round().max(1.0) as u32
        } else {
            1
        };
        let angle_bucket = self.angle_bucket(rotation_radians);
        let key = MaskKey {
            brush,
            size_px,
            angle_bucket,
        };

        let mut cache = self.cache.lock();
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }
        let radians = (angle_bucket as f32 * self.bucket_degrees).to_radians();
        let scaled = Arc::new(base.scaled(size_px, radians));
        cache.insert(key, Arc::clone(&scaled));
        Ok(scaled)
    }

    fn angle_bucket(&self, radians: f32) -> u32 {
        let buckets = (360.0 / self.bucket_degrees).round().max(1.0) as u32;
        if !radians.is_finite() {
            return 0;
        }
        let degrees = radians.rem_euclid(2.0 * PI).to_degrees();
        ((degrees / self.bucket_degrees).round() as u32) % buckets
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// (entries, bytes)
    pub fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.lock();
        (cache.len(), cache.total_size())
    }

    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        tracing::debug!("Clearing {} cached masks", cache.len());
        cache.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> MaskCacheConfig {
        MaskCacheConfig::default()
    }

    #[test]
    fn builtin_has_all_types() {
        let lib = BrushMaskLibrary::builtin(&config());
        assert_eq!(lib.available_types(), vec![BrushType::Round, BrushType::Flat]);
    }

    #[test]
    fn missing_assets_disable_types() {
        let (lib, errors) = BrushMaskLibrary::load_dir(Path::new("/no/such/brushes"), &config());
        assert!(lib.available_types().is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, InkError::AssetLoad { .. })));
        assert!(lib.get_mask(BrushType::Round, 10.0, 0.0).is_err());

        let lib = lib.with_fallbacks();
        assert!(lib.is_available(BrushType::Round));
    }

    #[test]
    fn bad_asset_leaves_other_types_alone() {
        let mut lib = BrushMaskLibrary::builtin(&config());
        assert!(lib.load_asset_bytes(BrushType::Flat, b"garbage").is_err());
        assert!(lib.is_available(BrushType::Flat));
        assert!(lib.is_available(BrushType::Round));
    }

    #[test]
    fn nearby_angles_share_cache_entry() {
        let lib = BrushMaskLibrary::builtin(&config());
        let a = lib.get_mask(BrushType::Flat, 20.2, 0.5f32.to_radians()).unwrap();
        let b = lib.get_mask(BrushType::Flat, 19.8, 0.7f32.to_radians()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(lib.cache_len(), 1);
        assert_eq!(a.size(), 20);

        lib.get_mask(BrushType::Flat, 20.0, 10f32.to_radians()).unwrap();
        assert_eq!(lib.cache_len(), 2);
    }

    #[test]
    fn full_turn_maps_to_bucket_zero() {
        let lib = BrushMaskLibrary::builtin(&config());
        let a = lib.get_mask(BrushType::Round, 8.0, 0.0).unwrap();
        let b = lib.get_mask(BrushType::Round, 8.0, 2.0 * PI).unwrap();
        let c = lib.get_mask(BrushType::Round, 8.0, -0.001).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn bounded_cache_evicts() {
        let lib = BrushMaskLibrary::builtin(&MaskCacheConfig {
            capacity: Some(3),
            ..config()
        });
        for size in 1..=10 {
            lib.get_mask(BrushType::Round, size as f32, 0.0).unwrap();
        }
        assert_eq!(lib.cache_len(), 3);
    }

    #[test]
    fn replacing_a_mask_invalidates_its_cache() {
        let mut lib = BrushMaskLibrary::builtin(&config());
        lib.get_mask(BrushType::Round, 12.0, 0.0).unwrap();
        lib.insert(BrushType::Round, BrushMask::synthesize(BrushType::Flat, 32));
        assert_eq!(lib.cache_len(), 0);
    }
}
