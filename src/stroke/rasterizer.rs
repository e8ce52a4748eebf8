//! Stroke rasterizer - stamps brush masks along the pointer path

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::sync::Arc;

use super::composite::{erase_pixel, ink_pixel};
use super::interpolation::{clip_segment, subdivide};
use super::{FinishedStroke, StrokePoint, StrokeSession, Tool};
use crate::brush::{apply_hardness, AngleMode, BrushMaskLibrary, BrushParameters};
use crate::canvas::{union_opt, Rect};
use crate::config::StrokeConfig;

/// Mask values below this are skipped
const MIN_MASK_OPACITY: f32 = 1.0 / 512.0;

pub struct StrokeRasterizer {
    library: Arc<BrushMaskLibrary>,
    rng: StdRng,
    spacing_ratio: f32,
}

impl StrokeRasterizer {
    pub fn new(library: Arc<BrushMaskLibrary>, config: &StrokeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            library,
            rng,
            spacing_ratio: config.spacing_ratio,
        }
    }

    pub fn library(&self) -> &Arc<BrushMaskLibrary> {
        &self.library
    }

    /// Maximum gap between stamps. Smaller brushes and stronger position
    /// jitter both tighten it.
    pub fn step_threshold(&self, params: &BrushParameters) -> f32 {
        (params.size * self.spacing_ratio / (1.0 + params.position_jitter)).max(1.0)
    }

    /// Start a stroke and stamp once at the initial point
    pub fn begin_stroke(
        &mut self,
        canvas: &mut RgbImage,
        params: &BrushParameters,
        tool: Tool,
        paper: Rgb<u8>,
        first: StrokePoint,
    ) -> StrokeSession {
        let mut session = StrokeSession::new(tool, params.sanitized(), paper, first);
        tracing::debug!(
            "Stroke begin: {:?} {:?} size={:.1} at ({:.1}, {:.1})",
            tool,
            session.params.brush_type,
            session.params.size,
            first.x,
            first.y
        );
        self.stamp_at(canvas, &mut session, first.position());
        session
    }

    /// Feed the next pointer sample. Returns the region inked by this call.
    pub fn extend_stroke(
        &mut self,
        canvas: &mut RgbImage,
        session: &mut StrokeSession,
        next: StrokePoint,
    ) -> Option<Rect> {
        if !(next.x.is_finite() && next.y.is_finite()) {
            tracing::debug!("Ignoring non-finite stroke point");
            return None;
        }
        session.push_point(next);

        let from = session.last_stamped;
        let to = next.position();
        let spacing = self.step_threshold(&session.params);
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        if (dx * dx + dy * dy).sqrt() <= spacing {
            return None;
        }
        session.direction = Some(dy.atan2(dx));
        session.last_stamped = to;

        // only the part of the segment that can still reach the canvas
        let reach = Self::max_reach(&session.params);
        let min = (-reach, -reach);
        let max = (canvas.width() as f32 + reach, canvas.height() as f32 + reach);
        let (start, end) = clip_segment(from, to, min, max)?;

        let mut delta = None;
        for p in subdivide(start, end, spacing) {
            delta = union_opt(delta, self.stamp_at(canvas, session, p));
        }
        delta
    }

    /// Farthest a stamp centered on the path can ink
    fn max_reach(params: &BrushParameters) -> f32 {
        let radius = params.size * (1.0 + params.size_jitter) / 2.0;
        radius + params.size * params.position_jitter + 1.0
    }

    pub fn end_stroke(&self, session: StrokeSession) -> FinishedStroke {
        if session.skipped > 0 {
            tracing::warn!("Stroke finished with {} skipped stamps", session.skipped);
        }
        tracing::debug!(
            "Stroke end: {} points, {} stamps, region {:?}",
            session.points.len(),
            session.stamps,
            session.inked
        );
        FinishedStroke {
            tool: session.tool,
            params: session.params,
            inked_region: session.inked,
            stamps: session.stamps,
            points: session.points.len(),
        }
    }

    fn stamp_at(
        &mut self,
        canvas: &mut RgbImage,
        session: &mut StrokeSession,
        center: (f32, f32),
    ) -> Option<Rect> {
        let footprint = self.stamp(canvas, session, center);
        if let Some(rect) = footprint {
            session.stamps += 1;
            session.grow(rect);
        }
        footprint
    }

    /// Apply one mask stamp. A stamp whose mask cannot be produced is
    /// skipped; the canvas is left untouched.
    fn stamp(
        &mut self,
        canvas: &mut RgbImage,
        session: &mut StrokeSession,
        center: (f32, f32),
    ) -> Option<Rect> {
        if !(center.0.is_finite() && center.1.is_finite()) {
            return None;
        }
        let params = session.params.clone();
        let angle = self.resolve_angle(&params, session.direction);
        let size = self.jittered_size(&params);
        let (cx, cy) = self.jittered_position(&params, center);

        let mask = match self.library.get_mask(params.brush_type, size, angle) {
            Ok(mask) if !mask.is_degenerate() => mask,
            Ok(_) => {
                session.skipped += 1;
                tracing::debug!("Skipping degenerate stamp at ({:.1}, {:.1})", cx, cy);
                return None;
            }
            Err(e) => {
                session.skipped += 1;
                tracing::warn!("Skipping stamp: {}", e);
                return None;
            }
        };

        let n = mask.size() as i64;
        let (w, h) = canvas.dimensions();
        let side = n as f32;
        let cx = cx.clamp(-side, w as f32 + side);
        let cy = cy.clamp(-side, h as f32 + side);
        let left = (cx - side / 2.0).round() as i64;
        let top = (cy - side / 2.0).round() as i64;
        let footprint =
            Rect::clipped(left, top, left.saturating_add(n), top.saturating_add(n), w, h)?;

        let base = params.density * params.flow;
        let feibai = params.feibai;
        let hardness = params.hardness;
        let color = Rgb(params.color);
        let paper = session.paper;
        let tool = session.tool;

        for y in footprint.y..footprint.bottom() {
            let my = (y as i64 - top) as u32;
            for x in footprint.x..footprint.right() {
                let mx = (x as i64 - left) as u32;
                let m = mask.get(mx, my);
                if m < MIN_MASK_OPACITY {
                    continue;
                }
                let mut opacity = apply_hardness(m, hardness) * base;
                if feibai > 0.0 {
                    let noise: f32 = self.rng.random();
                    opacity *= 1.0 - feibai * noise;
                }
                if opacity <= 0.0 {
                    continue;
                }
                let px = canvas.get_pixel_mut(x, y);
                match tool {
                    Tool::Brush => ink_pixel(px, color, opacity),
                    Tool::Eraser => erase_pixel(px, paper, opacity),
                }
            }
        }

        Some(footprint)
    }

    fn resolve_angle(&mut self, params: &BrushParameters, direction: Option<f32>) -> f32 {
        match params.angle_mode {
            AngleMode::FollowDirection => direction.unwrap_or(params.angle),
            AngleMode::Fixed => params.angle,
            AngleMode::Random => self.rng.random_range(0.0..TAU),
            AngleMode::Jittered => params.angle + self.signed_unit() * params.angle_jitter,
        }
    }

    fn jittered_size(&mut self, params: &BrushParameters) -> f32 {
        if params.size_jitter <= 0.0 {
            return params.size;
        }
        (params.size * (1.0 + params.size_jitter * self.signed_unit())).max(1.0)
    }

    fn jittered_position(&mut self, params: &BrushParameters, (x, y): (f32, f32)) -> (f32, f32) {
        if params.position_jitter <= 0.0 {
            return (x, y);
        }
        let reach = params.size * params.position_jitter;
        (
            x + reach * self.signed_unit(),
            y + reach * self.signed_unit(),
        )
    }

    fn signed_unit(&mut self) -> f32 {
        self.rng.random_range(-1.0f32..=1.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MaskCacheConfig;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn rasterizer() -> StrokeRasterizer {
        let library = Arc::new(BrushMaskLibrary::builtin(&MaskCacheConfig::default()));
        StrokeRasterizer::new(
            library,
            &StrokeConfig {
                seed: Some(7),
                ..StrokeConfig::default()
            },
        )
    }

    fn sharp_params() -> BrushParameters {
        BrushParameters {
            size: 20.0,
            density: 1.0,
            wetness: 0.0,
            feibai: 0.0,
            ..BrushParameters::default()
        }
    }

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, WHITE)
    }

    fn draw_line(
        r: &mut StrokeRasterizer,
        canvas: &mut RgbImage,
        params: &BrushParameters,
        tool: Tool,
        from: (f32, f32),
        to: (f32, f32),
    ) -> FinishedStroke {
        let first = StrokePoint::new(from.0, from.1, 0);
        let mut s = r.begin_stroke(canvas, params, tool, WHITE, first);
        r.extend_stroke(canvas, &mut s, StrokePoint::new(to.0, to.1, 16));
        r.end_stroke(s)
    }

    fn inked_pixels(img: &RgbImage) -> usize {
        img.pixels().filter(|p| **p != WHITE).count()
    }

    #[test]
    fn zero_length_stroke_stamps_once() {
        let mut r = rasterizer();
        let mut canvas = white(64, 64);
        let first = StrokePoint::new(32.0, 32.0, 0);
        let s = r.begin_stroke(&mut canvas, &sharp_params(), Tool::Brush, WHITE, first);
        let done = r.end_stroke(s);
        assert_eq!(done.stamps, 1);
        assert_eq!(done.inked_region, Some(Rect::new(22, 22, 20, 20)));
        assert!(!done.needs_diffusion());
        assert!(canvas.get_pixel(32, 32).0[0] < 5);
    }

    #[test]
    fn vertical_stroke_makes_sharp_band() {
        let mut r = rasterizer();
        let mut canvas = white(100, 100);
        let params = sharp_params();
        let done = draw_line(&mut r, &mut canvas, &params, Tool::Brush, (10.0, 10.0), (10.0, 60.0));

        let region = done.inked_region.unwrap();
        assert_eq!(region, Rect::new(0, 0, 20, 70));

        // solid core down the middle of the band
        for y in 15..55 {
            assert!(canvas.get_pixel(10, y).0[0] < 5, "gap at y={}", y);
        }
        // nothing outside the footprint
        for y in 0..100 {
            for x in 20..100 {
                assert_eq!(*canvas.get_pixel(x, y), WHITE);
            }
        }
        // band width is bounded by the brush diameter
        let row: Vec<u32> = (0..100).filter(|&x| *canvas.get_pixel(x, 35) != WHITE).collect();
        assert!(row.len() >= 12 && row.len() <= 20, "band width {}", row.len());
    }

    #[test]
    fn short_moves_accumulate_before_stamping() {
        let mut r = rasterizer();
        let mut canvas = white(64, 64);
        let params = sharp_params();
        let first = StrokePoint::new(30.0, 30.0, 0);
        let mut s = r.begin_stroke(&mut canvas, &params, Tool::Brush, WHITE, first);
        // threshold is 2px for size 20
        let near = StrokePoint::new(31.0, 30.0, 1);
        assert!(r.extend_stroke(&mut canvas, &mut s, near).is_none());
        let far = StrokePoint::new(33.0, 30.0, 2);
        assert!(r.extend_stroke(&mut canvas, &mut s, far).is_some());
        assert_eq!(s.stamp_count(), 3);
        assert_eq!(s.points().len(), 3);
    }

    #[test]
    fn offscreen_points_are_clipped_not_rejected() {
        let mut r = rasterizer();
        let mut canvas = white(40, 40);
        let params = sharp_params();
        let done = draw_line(&mut r, &mut canvas, &params, Tool::Brush, (-5.0, 20.0), (60.0, 20.0));
        let region = done.inked_region.unwrap();
        assert_eq!(region.x, 0);
        assert_eq!(region.right(), 40);
        assert!(canvas.get_pixel(0, 20).0[0] < 128);
    }

    #[test]
    fn fully_offscreen_stroke_inks_nothing() {
        let mut r = rasterizer();
        let mut canvas = white(40, 40);
        let params = sharp_params();
        let (from, to) = ((-100.0, -100.0), (-80.0, -100.0));
        let done = draw_line(&mut r, &mut canvas, &params, Tool::Brush, from, to);
        assert!(done.inked_region.is_none());
        assert_eq!(inked_pixels(&canvas), 0);
    }

    #[test]
    fn far_off_canvas_points_are_clipped() {
        let mut r = rasterizer();
        let mut canvas = white(100, 100);
        let params = sharp_params();

        // a start point far beyond the canvas inks nothing
        let first = StrokePoint::new(1.0e30, 10.0, 0);
        let s = r.begin_stroke(&mut canvas, &params, Tool::Brush, WHITE, first);
        assert!(r.end_stroke(s).inked_region.is_none());
        assert_eq!(inked_pixels(&canvas), 0);

        // a move far off the right edge inks up to the edge and stops
        let first = StrokePoint::new(10.0, 50.0, 0);
        let mut s = r.begin_stroke(&mut canvas, &params, Tool::Brush, WHITE, first);
        let delta = r.extend_stroke(&mut canvas, &mut s, StrokePoint::new(1.0e18, 50.0, 1));
        assert_eq!(delta.map(|d| d.right()), Some(100));
        assert!(s.stamp_count() < 100);
        assert!(canvas.get_pixel(99, 50).0[0] < 5);

        // and coming back from there resumes at the edge
        let back = StrokePoint::new(50.0, 50.0, 2);
        assert!(r.extend_stroke(&mut canvas, &mut s, back).is_some());
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let mut r = rasterizer();
        let mut canvas = white(40, 40);
        let params = sharp_params();
        let first = StrokePoint::new(20.0, 20.0, 0);
        let mut s = r.begin_stroke(&mut canvas, &params, Tool::Brush, WHITE, first);
        let before = canvas.clone();
        for (x, y) in [(f32::NAN, 5.0), (5.0, f32::INFINITY), (f32::NEG_INFINITY, 0.0)] {
            assert!(r.extend_stroke(&mut canvas, &mut s, StrokePoint::new(x, y, 1)).is_none());
        }
        assert_eq!(canvas, before);
        assert_eq!(s.points().len(), 1);
        assert_eq!(s.stamp_count(), 1);
    }

    #[test]
    fn feibai_only_lightens_the_stroke() {
        let mut canvas_dry = white(80, 80);
        let mut canvas_wet = white(80, 80);
        let base = BrushParameters {
            density: 0.5,
            ..sharp_params()
        };
        let dry = BrushParameters {
            feibai: 1.0,
            ..base.clone()
        };
        let (from, to) = ((20.0, 40.0), (60.0, 40.0));
        draw_line(&mut rasterizer(), &mut canvas_wet, &base, Tool::Brush, from, to);
        draw_line(&mut rasterizer(), &mut canvas_dry, &dry, Tool::Brush, from, to);
        let mut lighter = 0;
        for (d, w) in canvas_dry.pixels().zip(canvas_wet.pixels()) {
            assert!(d.0[0] >= w.0[0]);
            if d.0[0] > w.0[0] {
                lighter += 1;
            }
        }
        assert!(lighter > 0);
    }

    #[test]
    fn colored_ink_never_lightens_existing_pixels() {
        let mut r = rasterizer();
        let mut canvas = RgbImage::from_pixel(50, 50, Rgb([120, 200, 60]));
        let before = canvas.clone();
        let params = BrushParameters {
            color: [200, 20, 90],
            ..sharp_params()
        };
        draw_line(&mut r, &mut canvas, &params, Tool::Brush, (10.0, 25.0), (40.0, 25.0));
        for (a, b) in canvas.pixels().zip(before.pixels()) {
            for c in 0..3 {
                assert!(a.0[c] <= b.0[c]);
                assert!(a.0[c] >= b.0[c].min(params.color[c]));
            }
        }
    }

    #[test]
    fn eraser_restores_paper() {
        let mut r = rasterizer();
        let mut canvas = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        let params = BrushParameters {
            wetness: 0.9,
            ..sharp_params()
        };
        let done =
            draw_line(&mut r, &mut canvas, &params, Tool::Eraser, (25.0, 10.0), (25.0, 40.0));
        assert_eq!(*canvas.get_pixel(25, 25), WHITE);
        assert!(!done.needs_diffusion());
    }

    #[test]
    fn follow_direction_rotates_flat_brush() {
        let params = BrushParameters {
            brush_type: crate::brush::BrushType::Flat,
            ..sharp_params()
        };
        let mut horizontal = white(100, 100);
        let mut vertical = white(100, 100);
        let brush = Tool::Brush;
        draw_line(&mut rasterizer(), &mut horizontal, &params, brush, (30.0, 50.0), (70.0, 50.0));
        draw_line(&mut rasterizer(), &mut vertical, &params, brush, (50.0, 30.0), (50.0, 70.0));
        // a flat tip dragged along its length leaves a thin line
        let h_rows = (0..100).filter(|&y| *horizontal.get_pixel(50, y) != WHITE).count();
        let v_cols = (0..100).filter(|&x| *vertical.get_pixel(x, 50) != WHITE).count();
        assert!(h_rows < 10, "horizontal thickness {}", h_rows);
        assert!(v_cols < 10, "vertical thickness {}", v_cols);
    }

    #[test]
    fn same_seed_same_pixels() {
        let params = BrushParameters {
            feibai: 0.7,
            position_jitter: 0.3,
            size_jitter: 0.3,
            angle_mode: AngleMode::Random,
            ..sharp_params()
        };
        let mut a = white(80, 80);
        let mut b = white(80, 80);
        draw_line(&mut rasterizer(), &mut a, &params, Tool::Brush, (10.0, 10.0), (70.0, 70.0));
        draw_line(&mut rasterizer(), &mut b, &params, Tool::Brush, (10.0, 10.0), (70.0, 70.0));
        assert_eq!(a, b);
    }

    #[test]
    fn jittered_strokes_stay_within_cache_budget() {
        let budget = 256 * 1024;
        let library = Arc::new(BrushMaskLibrary::builtin(&MaskCacheConfig {
            max_bytes: Some(budget),
            ..MaskCacheConfig::default()
        }));
        let mut r = StrokeRasterizer::new(
            Arc::clone(&library),
            &StrokeConfig {
                seed: Some(11),
                ..StrokeConfig::default()
            },
        );
        let params = BrushParameters {
            size: 60.0,
            size_jitter: 1.0,
            angle_mode: AngleMode::Random,
            ..sharp_params()
        };
        let mut canvas = white(200, 200);
        for row in 0..5 {
            let y = 20.0 + row as f32 * 40.0;
            draw_line(&mut r, &mut canvas, &params, Tool::Brush, (10.0, y), (190.0, y));
            let (_, bytes) = library.cache_stats();
            assert!(bytes <= budget, "cache holds {} bytes", bytes);
        }
        assert!(library.cache_len() > 0);
        assert!(inked_pixels(&canvas) > 0);
    }

    #[test]
    fn jitter_tightens_threshold() {
        let r = rasterizer();
        let calm = sharp_params();
        let shaky = BrushParameters {
            position_jitter: 1.0,
            ..sharp_params()
        };
        assert!(r.step_threshold(&shaky) < r.step_threshold(&calm));
        let tiny = BrushParameters {
            size: 3.0,
            ..sharp_params()
        };
        assert_eq!(r.step_threshold(&tiny), 1.0);
    }
}
