//! Path subdivision for continuous strokes

type Point = (f32, f32);

/// Evenly spaced points from `from` (exclusive) to `to` (inclusive) such that
/// no gap exceeds `spacing`. Empty when the segment is not longer than
/// `spacing`.
pub fn subdivide(from: Point, to: Point, spacing: f32) -> Vec<Point> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let dist = (dx * dx + dy * dy).sqrt();
    let spacing = spacing.max(f32::EPSILON);

    if !dist.is_finite() || dist <= spacing {
        return Vec::new();
    }

    let steps = (dist / spacing).ceil() as usize;
    (1..=steps)
        .map(|step| {
            let t = step as f32 / steps as f32;
            (from.0 + dx * t, from.1 + dy * t)
        })
        .collect()
}

/// Clip a segment to the box `[min, max]` (Liang-Barsky). Endpoints already
/// inside are returned unchanged; `None` if the segment misses the box.
pub fn clip_segment(from: Point, to: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let dx = to.0 as f64 - x0;
    let dy = to.1 as f64 - y0;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    let edges = [
        (-dx, x0 - min.0 as f64),
        (dx, max.0 as f64 - x0),
        (-dy, y0 - min.1 as f64),
        (dy, max.1 as f64 - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f64| ((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    let start = if t0 > 0.0 { at(t0) } else { from };
    let end = if t1 < 1.0 { at(t1) } else { to };
    Some((start, end))
}
