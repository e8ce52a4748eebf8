//! Diffusion module - post-stroke ink bleed
//!
//! After a wet brush stroke ends, the inked region (plus a margin) is run
//! through a bilateral filter and blended back with a per-channel minimum,
//! so ink spreads into the surrounding paper but nothing ever gets lighter.

mod bilateral;

pub use bilateral::BilateralKernel;

use image::RgbImage;
use std::time::Instant;

use crate::canvas::Rect;
use crate::config::DiffusionConfig;

/// Filter parameters resolved for one stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionParams {
    pub sigma_space: f32,
    pub sigma_color: f32,
    pub radius: u32,
    pub margin: u32,
}

#[derive(Debug, Clone)]
pub struct DiffusionEngine {
    config: DiffusionConfig,
}

impl DiffusionEngine {
    pub fn new(config: &DiffusionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Resolve sigmas, kernel radius and margin. `None` when wetness is zero.
    pub fn params(&self, wetness: f32, brush_size: f32) -> Option<DiffusionParams> {
        if !(wetness > 0.0) {
            return None;
        }
        let wetness = wetness.min(1.0);
        let sigma_space = (wetness * self.config.max_sigma_space).max(1.0);
        let sigma_color = (wetness * self.config.max_sigma_color).max(1.0);
        let radius = ((1.5 * sigma_space).ceil() as u32).min(self.config.max_radius).max(1);
        let bleed = wetness * brush_size.max(0.0) * self.config.margin_factor;
        let margin = (3.0 * sigma_space).max(bleed).ceil() as u32;
        Some(DiffusionParams {
            sigma_space,
            sigma_color,
            radius,
            margin,
        })
    }

    /// Inked region grown by the bleed margin, clamped to the canvas
    pub fn processing_region(
        &self,
        inked: Rect,
        wetness: f32,
        brush_size: f32,
        canvas_w: u32,
        canvas_h: u32,
    ) -> Option<Rect> {
        let params = self.params(wetness, brush_size)?;
        inked.expand(params.margin, canvas_w, canvas_h)
    }

    /// Diffuse one completed stroke in place. Returns the region that was
    /// processed, or `None` when there was nothing to do.
    pub fn diffuse(
        &self,
        canvas: &mut RgbImage,
        inked: Rect,
        wetness: f32,
        brush_size: f32,
    ) -> Option<Rect> {
        let params = self.params(wetness, brush_size)?;
        let region = inked.expand(params.margin, canvas.width(), canvas.height())?;
        let start = Instant::now();

        let original =
            image::imageops::crop_imm(canvas, region.x, region.y, region.width, region.height)
                .to_image();
        let kernel = BilateralKernel::new(params.sigma_space, params.sigma_color, params.radius);
        let mut blended = kernel.apply(&original);
        darken_blend(&mut blended, &original);

        image::imageops::replace(canvas, &blended, region.x as i64, region.y as i64);

        tracing::debug!(
            "Diffused {}x{} region at ({}, {}) sigma_s={:.1} sigma_r={:.1} r={} in {:?}",
            region.width,
            region.height,
            region.x,
            region.y,
            params.sigma_space,
            params.sigma_color,
            params.radius,
            start.elapsed()
        );
        Some(region)
    }
}

/// `filtered = min(filtered, original)` per channel
fn darken_blend(filtered: &mut RgbImage, original: &RgbImage) {
    for (f, o) in filtered.pixels_mut().zip(original.pixels()) {
        for c in 0..3 {
            f.0[c] = f.0[c].min(o.0[c]);
        }
    }
}
