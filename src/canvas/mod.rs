//! Canvas data model - pixel buffer, viewport and bounded undo history
//!
//! `PixelCanvas` owns the only live buffer. Drawing code borrows it through
//! [`PixelCanvas::view_mut`]; history stores independent compressed copies.

mod history;
mod io;
mod rect;
mod viewport;

pub use history::{History, Snapshot};
pub use io::{decode_rgb, encode_rgb, ExportFormat};
pub use rect::{union_opt, Rect};
pub use viewport::ViewportTransform;

use image::{Rgb, RgbImage};
use std::path::Path;

use crate::config::InkConfig;
use crate::error::{InkError, InkResult};

/// Largest accepted canvas edge
pub const MAX_DIMENSION: u32 = 16384;

pub struct PixelCanvas {
    buffer: RgbImage,
    paper: Rgb<u8>,
    viewport: ViewportTransform,
    history: History,
}

impl PixelCanvas {
    /// Create a paper-filled canvas
    pub fn new(width: u32, height: u32, config: &InkConfig) -> InkResult<Self> {
        validate_dimensions(width, height)?;
        let paper = Rgb(config.paper_color);
        let buffer = RgbImage::from_pixel(width, height, paper);
        let history = History::new(&buffer, config.history.capacity);
        tracing::info!("Canvas created: {}x{}", width, height);
        Ok(Self {
            buffer,
            paper,
            viewport: ViewportTransform::new(&config.viewport),
            history,
        })
    }

    pub fn from_config(config: &InkConfig) -> InkResult<Self> {
        Self::new(config.canvas_width, config.canvas_height, config)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn paper_color(&self) -> Rgb<u8> {
        self.paper
    }

    /// Read-only view of the live buffer for display
    pub fn buffer(&self) -> &RgbImage {
        &self.buffer
    }

    /// Scoped mutable view for the stroke and diffusion passes
    pub fn view_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    /// Replace the buffer with blank paper of the new size ("new canvas").
    /// History is reset to the blank state.
    pub fn resize(&mut self, width: u32, height: u32) -> InkResult<()> {
        validate_dimensions(width, height)?;
        self.buffer = RgbImage::from_pixel(width, height, self.paper);
        self.history.reset(&self.buffer);
        self.viewport.reset();
        tracing::info!("Canvas resized: {}x{}", width, height);
        Ok(())
    }

    /// Decode and adopt an image. On failure the current buffer is untouched.
    pub fn load_image(&mut self, bytes: &[u8]) -> InkResult<()> {
        let decoded = decode_rgb(bytes)?;
        validate_dimensions(decoded.width(), decoded.height())
            .map_err(|e| InkError::Decode(e.to_string()))?;
        tracing::info!("Image loaded: {}x{}", decoded.width(), decoded.height());
        self.buffer = decoded;
        self.history.reset(&self.buffer);
        self.viewport.reset();
        Ok(())
    }

    pub fn load_image_file(&mut self, path: &Path) -> InkResult<()> {
        let bytes = std::fs::read(path)?;
        self.load_image(&bytes)
    }

    /// Encode the full buffer at native resolution; the viewport never applies.
    pub fn encode(&self, format: ExportFormat) -> InkResult<Vec<u8>> {
        encode_rgb(&self.buffer, format)
    }

    /// Save, picking the format from the path extension
    pub fn save_to_path(&self, path: &Path) -> InkResult<()> {
        let name = path.to_string_lossy();
        let format = ExportFormat::from_path(&name)
            .ok_or_else(|| InkError::Encode(format!("unsupported extension: {}", name)))?;
        let bytes = self.encode(format)?;
        std::fs::write(path, bytes).map_err(|e| InkError::Encode(e.to_string()))?;
        tracing::info!("Canvas saved to {:?}", path);
        Ok(())
    }

    /// Copy a region out of the canvas. The rect is clipped to the bounds.
    pub fn read_region(&self, rect: Rect) -> Option<RgbImage> {
        let r = self.clip(rect)?;
        Some(image::imageops::crop_imm(&self.buffer, r.x, r.y, r.width, r.height).to_image())
    }

    /// Paste `pixels` with its top-left at `rect`'s origin.
    pub fn write_region(&mut self, rect: Rect, pixels: &RgbImage) -> InkResult<()> {
        if pixels.dimensions() != (rect.width, rect.height) {
            return Err(InkError::InvalidDimensions {
                width: pixels.width(),
                height: pixels.height(),
            });
        }
        if self.clip(rect) != Some(rect) {
            return Err(InkError::InvalidDimensions {
                width: rect.right(),
                height: rect.bottom(),
            });
        }
        image::imageops::replace(&mut self.buffer, pixels, rect.x as i64, rect.y as i64);
        Ok(())
    }

    /// Fill with a solid color (clear uses the paper color)
    pub fn fill(&mut self, color: Rgb<u8>) {
        for px in self.buffer.pixels_mut() {
            *px = color;
        }
    }

    pub fn clear(&mut self) {
        self.fill(self.paper);
    }

    /// Commit the current buffer to history
    pub fn snapshot(&mut self) {
        self.history.commit(&self.buffer);
    }

    /// Drop history and make the current buffer the new floor
    pub fn reset_history(&mut self) {
        self.history.reset(&self.buffer);
    }

    /// Returns `true` if the buffer changed
    pub fn undo(&mut self) -> bool {
        let restored = self.history.undo();
        self.adopt(restored)
    }

    /// Returns `true` if the buffer changed
    pub fn redo(&mut self) -> bool {
        let restored = self.history.redo();
        self.adopt(restored)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.viewport.pan(dx, dy);
    }

    /// Zoom around a canvas-space point
    pub fn zoom(&mut self, factor: f32, center_x: f32, center_y: f32) {
        self.viewport.zoom_at(factor, center_x, center_y);
    }

    fn adopt(&mut self, restored: Option<RgbImage>) -> bool {
        match restored {
            Some(img) => {
                self.buffer = img;
                true
            }
            None => false,
        }
    }

    fn clip(&self, rect: Rect) -> Option<Rect> {
        Rect::clipped(
            rect.x as i64,
            rect.y as i64,
            rect.right() as i64,
            rect.bottom() as i64,
            self.width(),
            self.height(),
        )
    }
}

fn validate_dimensions(width: u32, height: u32) -> InkResult<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(InkError::InvalidDimensions { width, height });
    }
    Ok(())
}
