//! Caller-facing result types

use image::{Pixel, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in caller pixel space
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge X coordinate
    pub x0: i32,
    /// Top edge Y coordinate
    pub y0: i32,
    /// Right edge X coordinate (exclusive)
    pub x1: i32,
    /// Bottom edge Y coordinate (exclusive)
    pub y1: i32,
}

impl PixelRect {
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest pixel rectangle covering `[x0, x1] x [y0, y1]` after scaling.
    /// Edges round outward so the result never clips the scaled region,
    /// and come out ordered whatever the sign of the inputs.
    #[must_use]
    pub fn covering(x0: f32, y0: f32, x1: f32, y1: f32, scale: f32) -> Self {
        let (ax, bx) = (x0 * scale, x1 * scale);
        let (ay, by) = (y0 * scale, y1 * scale);
        Self {
            x0: ax.min(bx).floor() as i32,
            y0: ay.min(by).floor() as i32,
            x1: ax.max(bx).ceil() as i32,
            y1: ay.max(by).ceil() as i32,
        }
    }

    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Link target type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    /// Page inside this document (0-indexed)
    Internal { page: usize },
    /// Anything else, kept verbatim
    External { uri: String },
}

/// Link rectangle in pixel coordinates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub bounds: PixelRect,
    pub target: LinkTarget,
}

impl PageLink {
    /// Target page, or -1 for external links
    #[must_use]
    pub fn page_number(&self) -> i32 {
        match self.target {
            LinkTarget::Internal { page } => i32::try_from(page).unwrap_or(i32::MAX),
            LinkTarget::External { .. } => -1,
        }
    }

    /// Target URI, empty for internal links
    #[must_use]
    pub fn uri(&self) -> &str {
        match &self.target {
            LinkTarget::Internal { .. } => "",
            LinkTarget::External { uri } => uri,
        }
    }
}

/// Output of a single render call
///
/// The raster is non-premultiplied RGBA, row-major, with a stride of exactly
/// `width * 4`. It belongs to the caller; the document keeps no reference.
#[derive(Clone)]
pub struct RenderedPage {
    /// Page number (0-indexed)
    pub page_num: usize,
    /// Scale factor used for rendering
    pub scale_factor: f32,
    pub image: RgbaImage,
    /// Text search hits, in document search order
    pub search_hits: Vec<PixelRect>,
    /// Clickable link areas
    pub links: Vec<PageLink>,
}

impl RenderedPage {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bytes per row
    #[must_use]
    pub fn stride(&self) -> usize {
        self.image.width() as usize * 4
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Blend `color` over every search hit, clipped to the raster
    pub fn highlight_hits(&mut self, color: Rgba<u8>) {
        let width = i64::from(self.image.width());
        let height = i64::from(self.image.height());

        for hit in &self.search_hits {
            let x0 = i64::from(hit.x0).clamp(0, width) as u32;
            let x1 = i64::from(hit.x1).clamp(0, width) as u32;
            let y0 = i64::from(hit.y0).clamp(0, height) as u32;
            let y1 = i64::from(hit.y1).clamp(0, height) as u32;

            for y in y0..y1 {
                for x in x0..x1 {
                    self.image.get_pixel_mut(x, y).blend(&color);
                }
            }
        }
    }
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_num", &self.page_num)
            .field("scale_factor", &self.scale_factor)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("search_hits_count", &self.search_hits.len())
            .field("links_count", &self.links.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page(width: u32, height: u32, hits: Vec<PixelRect>) -> RenderedPage {
        RenderedPage {
            page_num: 0,
            scale_factor: 1.0,
            image: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            search_hits: hits,
            links: vec![],
        }
    }

    #[test]
    fn covering_rounds_outward() {
        let rect = PixelRect::covering(10.2, 20.7, 30.1, 40.9, 1.0);
        assert_eq!(rect, PixelRect::new(10, 20, 31, 41));

        let rect = PixelRect::covering(-0.5, -0.5, 0.5, 0.5, 2.0);
        assert_eq!(rect, PixelRect::new(-1, -1, 1, 1));
    }

    #[test]
    fn covering_orders_edges_for_negative_scale() {
        let rect = PixelRect::covering(10.2, 20.7, 30.1, 40.9, -1.0);
        assert_eq!(rect, PixelRect::new(-31, -41, -10, -20));
        assert!(!rect.is_empty());
    }

    #[test]
    fn covering_orders_swapped_edges() {
        let rect = PixelRect::covering(30.1, 40.9, 10.2, 20.7, 1.0);
        assert_eq!(rect, PixelRect::new(10, 20, 31, 41));
    }

    #[test]
    fn link_accessors_follow_target() {
        let internal = PageLink {
            bounds: PixelRect::default(),
            target: LinkTarget::Internal { page: 3 },
        };
        assert_eq!(internal.page_number(), 3);
        assert_eq!(internal.uri(), "");

        let external = PageLink {
            bounds: PixelRect::default(),
            target: LinkTarget::External {
                uri: "http://www.gamesdiner.com".into(),
            },
        };
        assert_eq!(external.page_number(), -1);
        assert_eq!(external.uri(), "http://www.gamesdiner.com");
    }

    #[test]
    fn stride_is_four_bytes_per_pixel() {
        let page = blank_page(827, 3, vec![]);
        assert_eq!(page.stride(), 3308);
        assert_eq!(page.pixels().len(), 3308 * 3);
    }

    #[test]
    fn highlight_touches_only_hit_pixels() {
        let mut page = blank_page(4, 4, vec![PixelRect::new(1, 1, 3, 2)]);
        page.highlight_hits(Rgba([0, 0, 255, 255]));

        assert_eq!(*page.image.get_pixel(1, 1), Rgba([0, 0, 255, 255]));
        assert_eq!(*page.image.get_pixel(2, 1), Rgba([0, 0, 255, 255]));
        assert_eq!(*page.image.get_pixel(0, 1), Rgba([255, 255, 255, 255]));
        assert_eq!(*page.image.get_pixel(1, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn highlight_clips_to_raster() {
        let mut page = blank_page(2, 2, vec![PixelRect::new(-5, -5, 50, 50)]);
        page.highlight_hits(Rgba([255, 0, 0, 255]));
        assert!(page.image.pixels().all(|px| *px == Rgba([255, 0, 0, 255])));
    }
}
