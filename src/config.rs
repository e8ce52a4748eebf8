//! Engine configuration
//!
//! Every field has a default, so a partial (or missing) `config.json` is
//! valid. Values are sanitized on load rather than rejected.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::InkResult;

pub const CONFIG_DIR_NAME: &str = "inkwash";
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Default scaled-mask budget (64 MiB)
pub const DEFAULT_MASK_CACHE_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries kept
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskCacheConfig {
    /// Angular bucket width used for the cache key, in degrees
    pub rotation_bucket_degrees: f32,
    /// LRU entry cap; `None` leaves the entry count unbounded
    pub capacity: Option<usize>,
    /// LRU byte budget for scaled masks; `None` disables the budget
    pub max_bytes: Option<usize>,
}

impl Default for MaskCacheConfig {
    fn default() -> Self {
        Self {
            rotation_bucket_degrees: 1.0,
            capacity: None,
            max_bytes: Some(DEFAULT_MASK_CACHE_BYTES),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrokeConfig {
    /// Stamp spacing as a fraction of brush size
    pub spacing_ratio: f32,
    /// Seed for feibai noise and jitter; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            spacing_ratio: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffusionConfig {
    /// Spatial sigma reached at wetness 1.0
    pub max_sigma_space: f32,
    /// Range sigma reached at wetness 1.0
    pub max_sigma_color: f32,
    /// Upper bound on the filter kernel radius
    pub max_radius: u32,
    /// Scales the `wetness * brush_size` part of the processing margin
    pub margin_factor: f32,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            max_sigma_space: 20.0,
            max_sigma_color: 150.0,
            max_radius: 16,
            margin_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InkConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub paper_color: [u8; 3],
    pub viewport: ViewportConfig,
    pub history: HistoryConfig,
    pub mask_cache: MaskCacheConfig,
    pub stroke: StrokeConfig,
    pub diffusion: DiffusionConfig,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1000,
            canvas_height: 800,
            paper_color: [255, 255, 255],
            viewport: ViewportConfig::default(),
            history: HistoryConfig::default(),
            mask_cache: MaskCacheConfig::default(),
            stroke: StrokeConfig::default(),
            diffusion: DiffusionConfig::default(),
        }
    }
}

impl InkConfig {
    /// Load config from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> InkResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the per-user config directory.
    pub fn load_default() -> InkResult<Self> {
        Self::load(&default_config_path())
    }

    pub fn from_json(json: &str) -> InkResult<Self> {
        let config: InkConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.canvas_width = self.canvas_width.max(1);
        self.canvas_height = self.canvas_height.max(1);

        let vp = &mut self.viewport;
        vp.min_zoom = vp.min_zoom.max(0.01);
        if vp.max_zoom < vp.min_zoom {
            vp.max_zoom = vp.min_zoom;
        }

        self.history.capacity = self.history.capacity.max(1);
        self.mask_cache.rotation_bucket_degrees =
            self.mask_cache.rotation_bucket_degrees.clamp(0.1, 90.0);
        if let Some(cap) = self.mask_cache.capacity.as_mut() {
            *cap = (*cap).max(1);
        }
        if let Some(bytes) = self.mask_cache.max_bytes.as_mut() {
            *bytes = (*bytes).max(1);
        }
        self.stroke.spacing_ratio = self.stroke.spacing_ratio.clamp(0.01, 2.0);

        let d = &mut self.diffusion;
        d.max_sigma_space = d.max_sigma_space.max(1.0);
        d.max_sigma_color = d.max_sigma_color.max(1.0);
        d.max_radius = d.max_radius.max(1);
        d.margin_factor = d.margin_factor.max(0.0);
        self
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}
