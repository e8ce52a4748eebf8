//! Per-pixel compositing for ink and eraser stamps

use image::Rgb;

/// Darken toward `min(existing, color)` by `opacity`. The result always lies
/// between that minimum and `existing`, so ink can never lighten.
#[inline]
pub fn ink_channel(existing: u8, color: u8, opacity: f32) -> u8 {
    let target = existing.min(color);
    lerp_u8(existing, target, opacity)
}

/// Move toward the paper color by `opacity`
#[inline]
pub fn erase_channel(existing: u8, paper: u8, opacity: f32) -> u8 {
    lerp_u8(existing, paper, opacity)
}

#[inline]
pub fn ink_pixel(px: &mut Rgb<u8>, color: Rgb<u8>, opacity: f32) {
    for c in 0..3 {
        px.0[c] = ink_channel(px.0[c], color.0[c], opacity);
    }
}

#[inline]
pub fn erase_pixel(px: &mut Rgb<u8>, paper: Rgb<u8>, opacity: f32) {
    for c in 0..3 {
        px.0[c] = erase_channel(px.0[c], paper.0[c], opacity);
    }
}

#[inline]
fn lerp_u8(from: u8, to: u8, t: f32) -> u8 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let a = from as f32;
    let b = to as f32;
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}
