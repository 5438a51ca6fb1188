//! Text search over a display list

use log::warn;

use super::engine::{EngineDisplayList, Quad};
use super::types::PixelRect;

/// Search `list` for `needle` and return up to `max_hits` hit rectangles in
/// pixel space. An empty needle never reaches the engine.
pub fn search_hits<L: EngineDisplayList>(
    list: &L,
    scale: f32,
    needle: &str,
    max_hits: usize,
) -> Vec<PixelRect> {
    if needle.is_empty() || max_hits == 0 {
        return Vec::new();
    }

    match list.search(needle, max_hits) {
        Ok(quads) => quads
            .iter()
            .take(max_hits)
            .map(|quad| quad_to_rect(quad, scale))
            .collect(),
        Err(e) => {
            warn!("Text search for {needle:?} failed: {e}");
            Vec::new()
        }
    }
}

/// Axis-aligned pixel box around a possibly rotated quad.
///
/// Bounds come from all four corners, so the result is well ordered no
/// matter which logical corner ends up where on the page.
#[must_use]
pub fn quad_to_rect(quad: &Quad, scale: f32) -> PixelRect {
    let corners = quad.corners();
    let (mut x0, mut y0) = (f32::INFINITY, f32::INFINITY);
    let (mut x1, mut y1) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in corners {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    PixelRect::covering(x0, y0, x1, y1, scale)
}
