//! Brush module - parameters, opacity masks and the mask library

mod cache;
mod library;
mod mask;

pub use cache::{MaskCache, MaskKey};
pub use library::BrushMaskLibrary;
pub use mask::{apply_hardness, BrushMask, ScaledMask, BASE_MASK_SIZE};

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

/// Largest brush diameter accepted, in canvas pixels
pub const MAX_BRUSH_SIZE: f32 = 1000.0;

/// Brush tip shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrushType {
    #[default]
    Round,
    Flat,
}

impl BrushType {
    pub const ALL: [BrushType; 2] = [BrushType::Round, BrushType::Flat];

    pub fn name(&self) -> &'static str {
        match self {
            BrushType::Round => "round",
            BrushType::Flat => "flat",
        }
    }

    /// Asset file looked up by [`BrushMaskLibrary::load_dir`]
    pub fn asset_file_name(&self) -> &'static str {
        match self {
            BrushType::Round => "brush_round.png",
            BrushType::Flat => "brush_flat.png",
        }
    }
}

impl fmt::Display for BrushType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How each stamp's rotation is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AngleMode {
    /// Align with the current segment direction
    #[default]
    FollowDirection,
    /// Always `angle`
    Fixed,
    /// Uniform in [0, 2π)
    Random,
    /// `angle` plus a uniform offset within ±`angle_jitter`
    Jittered,
}

/// Per-stroke brush parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushParameters {
    pub brush_type: BrushType,
    /// Diameter in canvas pixels
    pub size: f32,
    /// Ink opacity (0.0 - 1.0)
    pub density: f32,
    /// Post-stroke diffusion strength (0.0 - 1.0)
    pub wetness: f32,
    /// Dry-brush breakup amount (0.0 - 1.0)
    pub feibai: f32,
    /// Edge falloff (0.0 = soft, 1.0 = mask as authored)
    pub hardness: f32,
    /// Per-stamp ink flow (0.0 - 1.0)
    pub flow: f32,
    /// RGB ink color
    pub color: [u8; 3],
    pub angle_mode: AngleMode,
    /// Base angle in radians for `Fixed` and `Jittered`
    pub angle: f32,
    /// Position jitter as a fraction of size
    pub position_jitter: f32,
    /// Size jitter as a fraction of size
    pub size_jitter: f32,
    /// Angle jitter in radians
    pub angle_jitter: f32,
}

impl Default for BrushParameters {
    fn default() -> Self {
        Self {
            brush_type: BrushType::Round,
            size: 40.0,
            density: 0.6,
            wetness: 0.0,
            feibai: 0.2,
            hardness: 1.0,
            flow: 1.0,
            color: [0, 0, 0],
            angle_mode: AngleMode::FollowDirection,
            angle: 0.0,
            position_jitter: 0.0,
            size_jitter: 0.0,
            angle_jitter: 0.0,
        }
    }
}

impl BrushParameters {
    /// Clamp every field into its valid range. Out-of-range input is
    /// corrected, never rejected.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let out = Self {
            brush_type: self.brush_type,
            size: finite_or(self.size, defaults.size).clamp(1.0, MAX_BRUSH_SIZE),
            density: unit(self.density),
            wetness: unit(self.wetness),
            feibai: unit(self.feibai),
            hardness: unit(self.hardness),
            flow: unit(self.flow),
            color: self.color,
            angle_mode: self.angle_mode,
            angle: finite_or(self.angle, 0.0).rem_euclid(2.0 * PI),
            position_jitter: unit(self.position_jitter),
            size_jitter: unit(self.size_jitter),
            angle_jitter: finite_or(self.angle_jitter, 0.0).clamp(0.0, PI),
        };
        if out != *self {
            tracing::debug!("Brush parameters clamped: {:?} -> {:?}", self, out);
        }
        out
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

fn unit(v: f32) -> f32 {
    finite_or(v, 0.0).clamp(0.0, 1.0)
}
