//! Edge-preserving bilateral filter over an RGB working copy

use image::RgbImage;
use rayon::prelude::*;

/// Largest possible L1 distance between two RGB pixels
const MAX_L1: usize = 255 * 3;

#[derive(Debug, Clone)]
pub struct BilateralKernel {
    radius: u32,
    /// (2r+1)^2 spatial weights, row-major
    spatial: Vec<f32>,
    /// Range weight indexed by L1 color distance
    range: Vec<f32>,
}

impl BilateralKernel {
    pub fn new(sigma_space: f32, sigma_color: f32, radius: u32) -> Self {
        let r = radius as i32;
        let side = (2 * r + 1) as usize;
        let ss2 = 2.0 * sigma_space * sigma_space;
        let sr2 = 2.0 * sigma_color * sigma_color;

        let mut spatial = Vec::with_capacity(side * side);
        for dy in -r..=r {
            for dx in -r..=r {
                let d2 = (dx * dx + dy * dy) as f32;
                spatial.push((-d2 / ss2).exp());
            }
        }

        let range = (0..=MAX_L1)
            .map(|d| {
                let d = d as f32;
                (-(d * d) / sr2).exp()
            })
            .collect();

        Self {
            radius,
            spatial,
            range,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Filter `src` into a new image. Neighbors outside `src` are skipped and
    /// the remaining weights renormalized.
    pub fn apply(&self, src: &RgbImage) -> RgbImage {
        let (w, h) = src.dimensions();
        if w == 0 || h == 0 {
            return src.clone();
        }
        let (w, h) = (w as usize, h as usize);
        let stride = w * 3;
        let r = self.radius as i64;
        let side = (2 * r + 1) as usize;
        let src_raw = src.as_raw();

        let mut out = RgbImage::new(w as u32, h as u32);
        out.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row_out)| {
                for x in 0..w {
                    let ci = y * stride + x * 3;
                    let center = [src_raw[ci], src_raw[ci + 1], src_raw[ci + 2]];
                    let mut acc = [0.0f32; 3];
                    let mut total = 0.0f32;

                    let y0 = (y as i64 - r).max(0) as usize;
                    let y1 = (y as i64 + r).min(h as i64 - 1) as usize;
                    let x0 = (x as i64 - r).max(0) as usize;
                    let x1 = (x as i64 + r).min(w as i64 - 1) as usize;

                    for ny in y0..=y1 {
                        let ky = (ny as i64 - y as i64 + r) as usize;
                        let row = &src_raw[ny * stride..(ny + 1) * stride];
                        for nx in x0..=x1 {
                            let kx = (nx as i64 - x as i64 + r) as usize;
                            let ni = nx * 3;
                            let px = [row[ni], row[ni + 1], row[ni + 2]];
                            let dist = l1(center, px);
                            let weight = self.spatial[ky * side + kx] * self.range[dist];
                            acc[0] += weight * px[0] as f32;
                            acc[1] += weight * px[1] as f32;
                            acc[2] += weight * px[2] as f32;
                            total += weight;
                        }
                    }

                    let pi = x * 3;
                    if total > 0.0 {
                        for c in 0..3 {
                            row_out[pi + c] = (acc[c] / total).round().clamp(0.0, 255.0) as u8;
                        }
                    } else {
                        row_out[pi..pi + 3].copy_from_slice(&center);
                    }
                }
            });
        out
    }
}

#[inline]
fn l1(a: [u8; 3], b: [u8; 3]) -> usize {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| (p as i32 - q as i32).unsigned_abs() as usize)
        .sum()
}
