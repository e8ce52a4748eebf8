//! Stroke controller - sequences pointer events through the rasterizer and
//! diffusion engine, and owns tool state, the canvas and its history

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::brush::{BrushMaskLibrary, BrushParameters, BrushType};
use crate::canvas::{ExportFormat, PixelCanvas, Rect, ViewportTransform};
use crate::config::InkConfig;
use crate::diffusion::DiffusionEngine;
use crate::error::{InkError, InkResult};
use crate::stroke::{FinishedStroke, StrokePoint, StrokeRasterizer, StrokeSession, Tool};

/// Result of a completed stroke
#[derive(Debug, Clone)]
pub struct StrokeOutcome {
    pub stroke: FinishedStroke,
    /// Region the diffusion pass rewrote, if it ran
    pub diffused: Option<Rect>,
}

impl StrokeOutcome {
    /// Everything that changed on the canvas since pointer-down
    pub fn dirty_region(&self) -> Option<Rect> {
        crate::canvas::union_opt(self.stroke.inked_region, self.diffused)
    }
}

/// Undo/redo availability for UI buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFlags {
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct StrokeController {
    canvas: PixelCanvas,
    library: Arc<BrushMaskLibrary>,
    rasterizer: StrokeRasterizer,
    diffusion: DiffusionEngine,
    params: BrushParameters,
    tool: Tool,
    session: Option<StrokeSession>,
}

impl StrokeController {
    pub fn new(config: &InkConfig, library: Arc<BrushMaskLibrary>) -> InkResult<Self> {
        let canvas = PixelCanvas::from_config(config)?;
        let rasterizer = StrokeRasterizer::new(Arc::clone(&library), &config.stroke);
        Ok(Self {
            canvas,
            library,
            rasterizer,
            diffusion: DiffusionEngine::new(&config.diffusion),
            params: BrushParameters::default(),
            tool: Tool::Brush,
            session: None,
        })
    }

    /// Controller with the built-in brush shapes
    pub fn from_config(config: &InkConfig) -> InkResult<Self> {
        let library = Arc::new(BrushMaskLibrary::builtin(&config.mask_cache));
        Self::new(config, library)
    }

    // ------------------------------------------------------------------
    // Tool state
    // ------------------------------------------------------------------

    pub fn params(&self) -> &BrushParameters {
        &self.params
    }

    /// Takes effect from the next pointer-down
    pub fn set_parameters(&mut self, params: BrushParameters) {
        let params = params.sanitized();
        if !self.library.is_available(params.brush_type) {
            tracing::warn!("Brush '{}' is not available", params.brush_type);
        }
        self.params = params;
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        tracing::debug!("Tool: {:?}", tool);
        self.tool = tool;
    }

    pub fn available_brush_types(&self) -> Vec<BrushType> {
        self.library.available_types()
    }

    pub fn library(&self) -> &Arc<BrushMaskLibrary> {
        &self.library
    }

    // ------------------------------------------------------------------
    // Pointer events (screen coordinates)
    // ------------------------------------------------------------------

    pub fn is_stroke_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a stroke. A stroke still open from a missed pointer-up is
    /// finished first. Non-finite positions are dropped.
    pub fn pointer_down(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        timestamp_ms: u64,
    ) -> Option<Rect> {
        let point = self.to_canvas_point(screen_x, screen_y, timestamp_ms)?;
        if let Some(open) = self.session.take() {
            tracing::warn!("pointer_down while a stroke is open, finishing it");
            self.finish(open);
        }

        let paper = self.canvas.paper_color();
        let session = self.rasterizer.begin_stroke(
            self.canvas.view_mut(),
            &self.params,
            self.tool,
            paper,
            point,
        );
        let inked = session.inked_region();
        self.session = Some(session);
        inked
    }

    /// Returns the region inked by this move, if any
    pub fn pointer_move(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        timestamp_ms: u64,
    ) -> Option<Rect> {
        let point = self.to_canvas_point(screen_x, screen_y, timestamp_ms)?;
        let session = self.session.as_mut()?;
        self.rasterizer.extend_stroke(self.canvas.view_mut(), session, point)
    }

    /// Finish the stroke: stamp up to the release point, diffuse if the
    /// brush is wet, then commit a history snapshot. A non-finite release
    /// point ends the stroke where it last was.
    pub fn pointer_up(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        timestamp_ms: u64,
    ) -> Option<StrokeOutcome> {
        let point = self.to_canvas_point(screen_x, screen_y, timestamp_ms);
        let mut session = self.session.take()?;
        if let Some(point) = point {
            self.rasterizer.extend_stroke(self.canvas.view_mut(), &mut session, point);
        }
        Some(self.finish(session))
    }

    fn finish(&mut self, session: StrokeSession) -> StrokeOutcome {
        let stroke = self.rasterizer.end_stroke(session);
        let diffused = match stroke.inked_region {
            Some(inked) if stroke.needs_diffusion() => self.diffusion.diffuse(
                self.canvas.view_mut(),
                inked,
                stroke.params.wetness,
                stroke.params.size,
            ),
            _ => None,
        };
        self.canvas.snapshot();
        StrokeOutcome { stroke, diffused }
    }

    fn to_canvas_point(
        &self,
        screen_x: f32,
        screen_y: f32,
        timestamp_ms: u64,
    ) -> Option<StrokePoint> {
        let (x, y) = self.canvas.viewport().screen_to_canvas(screen_x, screen_y);
        if !(x.is_finite() && y.is_finite()) {
            tracing::debug!("Dropping non-finite pointer ({}, {})", screen_x, screen_y);
            return None;
        }
        Some(StrokePoint::new(x, y, timestamp_ms))
    }

    fn ensure_idle(&self) -> InkResult<()> {
        if self.session.is_some() {
            return Err(InkError::StrokeInProgress);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Document commands
    // ------------------------------------------------------------------

    pub fn new_canvas(&mut self, width: u32, height: u32) -> InkResult<()> {
        self.ensure_idle()?;
        self.canvas.resize(width, height)
    }

    /// Fill with paper; undoable
    pub fn clear(&mut self) -> InkResult<()> {
        self.ensure_idle()?;
        self.canvas.clear();
        self.canvas.snapshot();
        tracing::info!("Canvas cleared");
        Ok(())
    }

    pub fn load_image(&mut self, bytes: &[u8]) -> InkResult<()> {
        self.ensure_idle()?;
        self.canvas.load_image(bytes)
    }

    pub fn load_image_file(&mut self, path: &Path) -> InkResult<()> {
        self.ensure_idle()?;
        self.canvas.load_image_file(path)
    }

    pub fn encode(&self, format: ExportFormat) -> InkResult<Vec<u8>> {
        self.ensure_idle()?;
        self.canvas.encode(format)
    }

    pub fn save_to_path(&self, path: &Path) -> InkResult<()> {
        self.ensure_idle()?;
        self.canvas.save_to_path(path)
    }

    /// No-op while a stroke is open or nothing is left to undo
    pub fn undo(&mut self) -> bool {
        if self.session.is_some() {
            tracing::warn!("undo ignored during a stroke");
            return false;
        }
        self.canvas.undo()
    }

    pub fn redo(&mut self) -> bool {
        if self.session.is_some() {
            tracing::warn!("redo ignored during a stroke");
            return false;
        }
        self.canvas.redo()
    }

    pub fn history_flags(&self) -> HistoryFlags {
        let idle = self.session.is_none();
        HistoryFlags {
            can_undo: idle && self.canvas.can_undo(),
            can_redo: idle && self.canvas.can_redo(),
        }
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.canvas.pan(dx, dy);
    }

    /// Zoom keeping the canvas point `(cx, cy)` fixed on screen
    pub fn zoom(&mut self, factor: f32, cx: f32, cy: f32) {
        self.canvas.zoom(factor, cx, cy);
    }

    pub fn viewport(&self) -> &ViewportTransform {
        self.canvas.viewport()
    }

    pub fn canvas(&self) -> &PixelCanvas {
        &self.canvas
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn controller(w: u32, h: u32) -> StrokeController {
        let mut config = InkConfig {
            canvas_width: w,
            canvas_height: h,
            ..InkConfig::default()
        };
        config.stroke.seed = Some(42);
        StrokeController::from_config(&config).unwrap()
    }

    fn band_params(wetness: f32) -> BrushParameters {
        BrushParameters {
            size: 20.0,
            density: 1.0,
            wetness,
            feibai: 0.0,
            ..BrushParameters::default()
        }
    }

    fn vertical_stroke(c: &mut StrokeController) -> StrokeOutcome {
        c.pointer_down(10.0, 10.0, 0);
        c.pointer_move(10.0, 35.0, 8);
        c.pointer_up(10.0, 60.0, 16).unwrap()
    }

    #[test]
    fn dry_stroke_is_a_sharp_band() {
        let mut c = controller(100, 100);
        c.set_parameters(band_params(0.0));
        let outcome = vertical_stroke(&mut c);

        assert!(outcome.diffused.is_none());
        assert_eq!(outcome.dirty_region(), Some(Rect::new(0, 0, 20, 70)));
        let buf = c.canvas().buffer();
        assert!(buf.get_pixel(10, 35).0[0] < 5);
        assert_eq!(*buf.get_pixel(30, 35), WHITE);
        assert!(c.history_flags().can_undo);
    }

    #[test]
    fn wet_stroke_is_darker_or_equal_in_expanded_box() {
        let mut dry = controller(100, 100);
        dry.set_parameters(band_params(0.0));
        vertical_stroke(&mut dry);

        let mut wet = controller(100, 100);
        wet.set_parameters(band_params(0.8));
        let outcome = vertical_stroke(&mut wet);

        let region = outcome.diffused.unwrap();
        let inked = outcome.stroke.inked_region.unwrap();
        assert!(region.contains_rect(&inked));
        assert!(region.area() > inked.area());

        let (d, w) = (dry.canvas().buffer(), wet.canvas().buffer());
        let mut changed = 0;
        for (x, y, wp) in w.enumerate_pixels() {
            let dp = d.get_pixel(x, y);
            for ch in 0..3 {
                assert!(wp.0[ch] <= dp.0[ch]);
            }
            if wp != dp {
                assert!(region.contains(x, y));
                changed += 1;
            }
        }
        assert!(changed > 0);
    }

    #[test]
    fn far_off_pointers_do_not_crash() {
        let mut c = controller(100, 100);
        c.set_parameters(band_params(0.0));

        assert!(c.pointer_down(1.0e30, 10.0, 0).is_none());
        assert!(c.is_stroke_active());
        let outcome = c.pointer_up(1.0e30, 10.0, 1).unwrap();
        assert!(outcome.stroke.inked_region.is_none());

        c.pointer_down(10.0, 10.0, 2);
        let delta = c.pointer_move(1.0e18, 10.0, 3).unwrap();
        assert_eq!(delta.right(), 100);
        let outcome = c.pointer_up(1.0e18, 10.0, 4).unwrap();
        assert_eq!(outcome.dirty_region().map(|r| r.x), Some(0));
        assert!(c.canvas().buffer().get_pixel(99, 10).0[0] < 5);
    }

    #[test]
    fn non_finite_pointers_are_dropped() {
        let mut c = controller(50, 50);
        c.set_parameters(band_params(0.0));

        assert!(c.pointer_down(f32::NAN, 10.0, 0).is_none());
        assert!(!c.is_stroke_active());

        c.pointer_down(25.0, 25.0, 1);
        assert!(c.pointer_move(f32::INFINITY, 25.0, 2).is_none());
        let outcome = c.pointer_up(25.0, f32::NAN, 3).unwrap();
        assert_eq!(outcome.stroke.stamps, 1);
        assert_eq!(outcome.stroke.points, 1);
        assert_eq!(*c.canvas().buffer().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn click_without_movement_stamps_once() {
        let mut c = controller(64, 64);
        c.set_parameters(band_params(0.0));
        c.pointer_down(32.0, 32.0, 0);
        let outcome = c.pointer_up(32.0, 32.0, 5).unwrap();
        assert_eq!(outcome.stroke.stamps, 1);
        assert!(outcome.diffused.is_none());
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut c = controller(100, 100);
        c.set_parameters(band_params(0.5));
        let blank = c.canvas().buffer().clone();
        vertical_stroke(&mut c);
        let painted = c.canvas().buffer().clone();
        assert_ne!(painted, blank);

        assert!(c.undo());
        assert_eq!(*c.canvas().buffer(), blank);
        assert!(!c.undo());
        assert!(c.redo());
        assert_eq!(*c.canvas().buffer(), painted);
        assert!(!c.redo());
    }

    #[test]
    fn commands_refused_mid_stroke() {
        let mut c = controller(64, 64);
        c.set_parameters(band_params(0.0));
        c.pointer_down(10.0, 10.0, 0);
        c.pointer_up(20.0, 10.0, 1);
        c.pointer_down(30.0, 30.0, 2);

        assert!(c.is_stroke_active());
        assert!(!c.undo());
        assert!(!c.history_flags().can_undo);
        assert!(matches!(c.clear(), Err(InkError::StrokeInProgress)));
        assert!(matches!(c.new_canvas(10, 10), Err(InkError::StrokeInProgress)));
        assert!(matches!(
            c.encode(ExportFormat::Png),
            Err(InkError::StrokeInProgress)
        ));

        c.pointer_up(30.0, 30.0, 3);
        assert!(c.undo());
    }

    #[test]
    fn pointer_maps_through_viewport() {
        let mut c = controller(200, 200);
        c.set_parameters(band_params(0.0));
        c.zoom(2.0, 0.0, 0.0);
        c.pan(10.0, 20.0);
        // screen (110, 120) -> canvas (50, 50)
        c.pointer_down(110.0, 120.0, 0);
        c.pointer_up(110.0, 120.0, 1);
        let buf = c.canvas().buffer();
        assert!(buf.get_pixel(50, 50).0[0] < 5);
        assert_eq!(*buf.get_pixel(110, 120), WHITE);
    }

    #[test]
    fn eraser_never_diffuses() {
        let mut c = controller(80, 80);
        c.set_parameters(band_params(0.0));
        vertical_stroke(&mut c);
        c.set_tool(Tool::Eraser);
        c.set_parameters(band_params(1.0));
        let outcome = vertical_stroke(&mut c);
        assert!(outcome.diffused.is_none());
        assert_eq!(*c.canvas().buffer().get_pixel(10, 35), WHITE);
    }

    #[test]
    fn clear_is_undoable_and_new_canvas_resets() {
        let mut c = controller(64, 64);
        c.set_parameters(band_params(0.0));
        vertical_stroke(&mut c);
        let painted = c.canvas().buffer().clone();

        c.clear().unwrap();
        assert!(c.canvas().buffer().pixels().all(|p| *p == WHITE));
        assert!(c.undo());
        assert_eq!(*c.canvas().buffer(), painted);

        c.new_canvas(32, 16).unwrap();
        assert_eq!(c.canvas().dimensions(), (32, 16));
        assert_eq!(
            c.history_flags(),
            HistoryFlags {
                can_undo: false,
                can_redo: false
            }
        );
    }

    #[test]
    fn load_replaces_buffer_and_history() {
        let mut c = controller(64, 64);
        c.set_parameters(band_params(0.0));
        vertical_stroke(&mut c);

        let img = RgbImage::from_pixel(12, 7, Rgb([10, 20, 30]));
        let bytes = crate::canvas::encode_rgb(&img, ExportFormat::Png).unwrap();
        c.load_image(&bytes).unwrap();
        assert_eq!(c.canvas().dimensions(), (12, 7));
        assert!(!c.undo());

        assert!(matches!(c.load_image(b"not an image"), Err(InkError::Decode(_))));
        assert_eq!(c.canvas().dimensions(), (12, 7));
    }

    #[test]
    fn parameters_are_clamped() {
        let mut c = controller(16, 16);
        c.set_parameters(BrushParameters {
            density: 3.0,
            size: 0.0,
            ..BrushParameters::default()
        });
        assert_eq!(c.params().density, 1.0);
        assert_eq!(c.params().size, 1.0);
        assert_eq!(c.available_brush_types().len(), 2);
    }
}
