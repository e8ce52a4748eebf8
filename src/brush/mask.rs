//! Opacity masks
//!
//! A [`BrushMask`] is the authored shape at base resolution. A [`ScaledMask`]
//! is that shape resampled to a stamp size and rotated. Both are square
//! row-major arrays of opacity in [0, 1].

use image::DynamicImage;

use super::BrushType;
use crate::error::{InkError, InkResult};

/// Resolution of synthesized built-in shapes
pub const BASE_MASK_SIZE: u32 = 128;

/// Below this a mask pixel contributes nothing
const OPACITY_EPSILON: f32 = 1.0 / 512.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BrushMask {
    size: u32,
    data: Vec<f32>,
}

impl BrushMask {
    pub fn from_opacity(size: u32, data: Vec<f32>) -> Option<Self> {
        if size == 0 || data.len() != (size * size) as usize {
            return None;
        }
        let data = data.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Some(Self { size, data })
    }

    /// Decode an encoded image. Alpha images use alpha as opacity; opaque
    /// images use inverted luminance (black = full ink).
    pub fn decode(brush: BrushType, bytes: &[u8]) -> InkResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| InkError::asset(brush, e.to_string()))?;
        Self::from_image(brush, &img)
    }

    pub fn from_image(brush: BrushType, img: &DynamicImage) -> InkResult<Self> {
        let (w, h) = (img.width(), img.height());
        if w == 0 || h == 0 {
            return Err(InkError::asset(brush, "empty image"));
        }
        if w != h {
            return Err(InkError::asset(brush, format!("mask is not square ({}x{})", w, h)));
        }

        let data: Vec<f32> = if img.color().has_alpha() {
            img.to_luma_alpha8()
                .pixels()
                .map(|p| p.0[1] as f32 / 255.0)
                .collect()
        } else {
            img.to_luma8()
                .pixels()
                .map(|p| 1.0 - p.0[0] as f32 / 255.0)
                .collect()
        };

        if data.iter().all(|&v| v < OPACITY_EPSILON) {
            return Err(InkError::asset(brush, "mask is fully transparent"));
        }
        Ok(Self { size: w, data })
    }

    /// Procedural shape used when no asset is present
    pub fn synthesize(brush: BrushType, size: u32) -> Self {
        let size = size.max(2);
        let half = size as f32 / 2.0;
        let mut data = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = (x as f32 + 0.5 - half) / half;
                let dy = (y as f32 + 0.5 - half) / half;
                let d = match brush {
                    // disc of radius 0.4 * size
                    BrushType::Round => (dx * dx + dy * dy).sqrt() / 0.8,
                    // ellipse with semi-axes 0.45 x 0.15 of size
                    BrushType::Flat => ((dx / 0.9).powi(2) + (dy / 0.3).powi(2)).sqrt(),
                };
                data.push(1.0 - smoothstep(0.8, 1.0, d));
            }
        }
        Self { size, data }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Resample to `target` pixels, then rotate by `radians` about the center
    pub fn scaled(&self, target: u32, radians: f32) -> ScaledMask {
        let target = target.max(1);
        let resized = if target == self.size {
            self.data.clone()
        } else {
            resample(&self.data, self.size, target)
        };
        let data = if radians.abs() < 1e-6 || target == 1 {
            resized
        } else {
            rotate(&resized, target, radians)
        };
        ScaledMask { size: target, data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaledMask {
    size: u32,
    data: Vec<f32>,
}

impl ScaledMask {
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.size + x) as usize]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True when no pixel would deposit ink
    pub fn is_degenerate(&self) -> bool {
        self.size == 0 || self.data.iter().all(|&v| !(v >= OPACITY_EPSILON))
    }

    pub fn byte_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Reshape the opacity falloff. Hardness 1.0 is the identity; lower hardness
/// pushes partial opacities down, widening the soft edge.
#[inline]
pub fn apply_hardness(opacity: f32, hardness: f32) -> f32 {
    if hardness >= 1.0 {
        return opacity;
    }
    let gamma = 1.0 + 3.0 * (1.0 - hardness.max(0.0));
    opacity.powf(gamma)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-output-pixel taps along one axis. Shrinking averages the covered
/// source area; enlarging interpolates linearly between pixel centers.
fn axis_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f32 / dst as f32;
    (0..dst)
        .map(|o| {
            if dst < src {
                let start = o as f32 * scale;
                let end = start + scale;
                let mut taps = Vec::with_capacity(scale.ceil() as usize + 1);
                let mut i = start.floor() as u32;
                while (i as f32) < end && i < src {
                    let lo = start.max(i as f32);
                    let hi = end.min(i as f32 + 1.0);
                    if hi > lo {
                        taps.push((i as usize, (hi - lo) / scale));
                    }
                    i += 1;
                }
                taps
            } else {
                let s = ((o as f32 + 0.5) * scale - 0.5).clamp(0.0, (src - 1) as f32);
                let i0 = s.floor() as u32;
                let i1 = (i0 + 1).min(src - 1);
                let f = s - i0 as f32;
                vec![(i0 as usize, 1.0 - f), (i1 as usize, f)]
            }
        })
        .collect()
}

fn resample(src: &[f32], src_size: u32, dst_size: u32) -> Vec<f32> {
    let weights = axis_weights(src_size, dst_size);
    let (sw, dw) = (src_size as usize, dst_size as usize);

    // horizontal pass: src_size rows x dst_size cols
    let mut tmp = vec![0.0f32; sw * dw];
    for y in 0..sw {
        let row = &src[y * sw..(y + 1) * sw];
        for (x, taps) in weights.iter().enumerate() {
            tmp[y * dw + x] = taps.iter().map(|&(i, w)| row[i] * w).sum();
        }
    }

    // vertical pass
    let mut out = vec![0.0f32; dw * dw];
    for (y, taps) in weights.iter().enumerate() {
        for x in 0..dw {
            let v: f32 = taps.iter().map(|&(i, w)| tmp[i * dw + x] * w).sum();
            out[y * dw + x] = v.clamp(0.0, 1.0);
        }
    }
    out
}

/// Rotate about the center with bilinear sampling; taps off the source
/// lattice read as fully transparent.
fn rotate(src: &[f32], size: u32, radians: f32) -> Vec<f32> {
    let n = size as i64;
    let c = size as f32 / 2.0;
    let (sin, cos) = radians.sin_cos();
    let sample = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= n || y >= n {
            0.0
        } else {
            src[(y * n + x) as usize]
        }
    };

    let mut out = vec![0.0f32; (n * n) as usize];
    for y in 0..n {
        let py = y as f32 + 0.5 - c;
        for x in 0..n {
            let px = x as f32 + 0.5 - c;
            let sx = cos * px + sin * py + c - 0.5;
            let sy = -sin * px + cos * py + c - 0.5;
            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = sx - x0;
            let fy = sy - y0;
            let (x0, y0) = (x0 as i64, y0 as i64);
            let top = sample(x0, y0) * (1.0 - fx) + sample(x0 + 1, y0) * fx;
            let bottom = sample(x0, y0 + 1) * (1.0 - fx) + sample(x0 + 1, y0 + 1) * fx;
            out[(y * n + x) as usize] = (top * (1.0 - fy) + bottom * fy).clamp(0.0, 1.0);
        }
    }
    out
}
