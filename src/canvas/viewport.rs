//! Canvas <-> screen mapping
//!
//! `screen = canvas * zoom + pan`

use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportTransform {
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl ViewportTransform {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            zoom: 1.0f32.clamp(config.min_zoom, config.max_zoom),
            pan_x: 0.0,
            pan_y: 0.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan_offset(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    pub fn canvas_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.zoom + self.pan_x, y * self.zoom + self.pan_y)
    }

    pub fn screen_to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }

    /// Shift the view by a screen-space delta
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply zoom by `factor`, keeping canvas point `(cx, cy)` fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, cx: f32, cy: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!("Ignoring zoom factor {}", factor);
            return;
        }
        let (sx, sy) = self.canvas_to_screen(cx, cy);
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.pan_x = sx - cx * self.zoom;
        self.pan_y = sy - cy * self.zoom;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0f32.clamp(self.min_zoom, self.max_zoom);
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}
