use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, always non-empty and inside some canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from signed half-open bounds `[x0, x1) x [y0, y1)` clipped to a
    /// `bound_w x bound_h` canvas. Returns `None` if nothing is left.
    pub fn clipped(x0: i64, y0: i64, x1: i64, y1: i64, bound_w: u32, bound_h: u32) -> Option<Self> {
        let left = x0.max(0);
        let top = y0.max(0);
        let right = x1.min(bound_w as i64);
        let bottom = y1.min(bound_h as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Grow by `margin` on every side, clamped to the canvas
    pub fn expand(&self, margin: u32, bound_w: u32, bound_h: u32) -> Option<Rect> {
        let m = margin as i64;
        Rect::clipped(
            self.x as i64 - m,
            self.y as i64 - m,
            self.right() as i64 + m,
            self.bottom() as i64 + m,
            bound_w,
            bound_h,
        )
    }
}

/// Union of two optional rectangles
pub fn union_opt(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}
