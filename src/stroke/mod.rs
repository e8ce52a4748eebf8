//! Stroke module - per-stroke session state and the stamping rasterizer

mod composite;
mod interpolation;
mod rasterizer;

pub use composite::{erase_channel, erase_pixel, ink_channel, ink_pixel};
pub use interpolation::{clip_segment, subdivide};
pub use rasterizer::StrokeRasterizer;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::brush::BrushParameters;
use crate::canvas::{union_opt, Rect};

/// Active tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

/// A sampled pointer position in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
    /// Timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl StrokePoint {
    pub fn new(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Transient state for one pointer-down-to-up interaction
#[derive(Debug, Clone)]
pub struct StrokeSession {
    tool: Tool,
    params: BrushParameters,
    paper: Rgb<u8>,
    points: Vec<StrokePoint>,
    last_stamped: (f32, f32),
    direction: Option<f32>,
    inked: Option<Rect>,
    stamps: u32,
    skipped: u32,
}

impl StrokeSession {
    pub(crate) fn new(
        tool: Tool,
        params: BrushParameters,
        paper: Rgb<u8>,
        first: StrokePoint,
    ) -> Self {
        Self {
            tool,
            params,
            paper,
            points: vec![first],
            last_stamped: first.position(),
            direction: None,
            inked: None,
            stamps: 0,
            skipped: 0,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn params(&self) -> &BrushParameters {
        &self.params
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// Bounding rectangle of every stamp so far
    pub fn inked_region(&self) -> Option<Rect> {
        self.inked
    }

    pub fn stamp_count(&self) -> u32 {
        self.stamps
    }

    pub fn skipped_count(&self) -> u32 {
        self.skipped
    }

    /// Record a sample, keeping timestamps non-decreasing
    fn push_point(&mut self, mut point: StrokePoint) {
        if let Some(last) = self.points.last() {
            point.timestamp_ms = point.timestamp_ms.max(last.timestamp_ms);
        }
        self.points.push(point);
    }

    fn grow(&mut self, footprint: Rect) {
        self.inked = union_opt(self.inked, Some(footprint));
    }
}

/// What remains of a session after pointer-up
#[derive(Debug, Clone)]
pub struct FinishedStroke {
    pub tool: Tool,
    pub params: BrushParameters,
    pub inked_region: Option<Rect>,
    pub stamps: u32,
    pub points: usize,
}

impl FinishedStroke {
    /// Brush strokes with wetness get diffused; eraser strokes never do
    pub fn needs_diffusion(&self) -> bool {
        self.tool == Tool::Brush && self.params.wetness > 0.0 && self.inked_region.is_some()
    }
}
