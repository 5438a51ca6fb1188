//! Page rendering: raster, search hits and links from one display list

use image::RgbaImage;
use log::debug;

use super::document::{Document, Resources};
use super::engine::{
    EngineDisplayList, EngineDocument, EngineError, EnginePage, NativePixmap, RenderContext,
};
use super::error::{Error, Result};
use super::links::load_links;
use super::scale::{ScaleRequest, checked_scale_from_dpi, scale_from_dpi, scale_from_fit};
use super::search::search_hits;
use super::types::RenderedPage;

impl<C: RenderContext> Document<C> {
    /// Render `page` at `dpi`. When `needle` is not empty, the bounding boxes
    /// of up to `max_hits` matches on the page are returned with the image.
    pub fn render_page(
        &self,
        page: usize,
        dpi: f32,
        max_hits: usize,
        needle: &str,
    ) -> Result<RenderedPage> {
        self.render(page, ScaleRequest::Dpi(dpi), max_hits, needle)
    }

    /// Render `page` as large as possible within `max_width` x `max_height`
    /// pixels, keeping its aspect ratio.
    pub fn render_page_for_size(
        &self,
        page: usize,
        max_width: f32,
        max_height: f32,
        max_hits: usize,
        needle: &str,
    ) -> Result<RenderedPage> {
        let request = ScaleRequest::Fit {
            max_width,
            max_height,
        };
        self.render(page, request, max_hits, needle)
    }

    pub fn render(
        &self,
        page: usize,
        request: ScaleRequest,
        max_hits: usize,
        needle: &str,
    ) -> Result<RenderedPage> {
        self.with_resources(|resources| render_locked(resources, page, request, max_hits, needle))
    }
}

fn render_locked<C: RenderContext>(
    resources: &Resources<C>,
    page_num: usize,
    request: ScaleRequest,
    max_hits: usize,
    needle: &str,
) -> Result<RenderedPage> {
    resources.check_page(page_num)?;
    // A bad DPI is rejected before the engine loads anything
    if let ScaleRequest::Dpi(dpi) = request {
        checked_scale_from_dpi(dpi)?;
    }

    let load_failed = |source: EngineError| Error::PageLoadFailed {
        page: page_num,
        source,
    };
    let page = resources.document.load_page(page_num).map_err(load_failed)?;
    let display_list = page.display_list().map_err(load_failed)?;

    let scale = match request {
        ScaleRequest::Dpi(dpi) => scale_from_dpi(dpi),
        ScaleRequest::Fit {
            max_width,
            max_height,
        } => {
            let bounds = page.bounds().map_err(load_failed)?;
            scale_from_fit(bounds.width(), bounds.height(), max_width, max_height)?
        }
    };

    let pixmap = display_list
        .rasterize(scale)
        .map_err(|e| Error::image(format!("unable to rasterize page {page_num}: {e}")))?;
    let image = pixmap_to_rgba(pixmap)?;

    let search_hits = search_hits(&display_list, scale, needle, max_hits);
    let links = load_links(&page, scale);

    debug!(
        "Rendered page {page_num} at scale {scale:.3}: {}x{} px, {} hits, {} links",
        image.width(),
        image.height(),
        search_hits.len(),
        links.len()
    );

    Ok(RenderedPage {
        page_num,
        scale_factor: scale,
        image,
        search_hits,
        links,
    })
}

/// Repack an engine raster as straight-alpha RGBA with a tight stride.
///
/// RGB input gets an opaque alpha channel; premultiplied RGBA input is
/// un-premultiplied.
fn pixmap_to_rgba(pixmap: NativePixmap) -> Result<RgbaImage> {
    let NativePixmap {
        width,
        height,
        stride,
        components: n,
        samples,
    } = pixmap;

    if width == 0 || height == 0 {
        return Err(Error::image(format!("empty raster {width}x{height}")));
    }
    if n != 3 && n != 4 {
        return Err(Error::image(format!(
            "unsupported pixmap format: {n} channels"
        )));
    }

    let width_px = width as usize;
    let height_px = height as usize;
    let row_bytes = width_px * n;
    let expected_min = stride.saturating_mul(height_px);
    if row_bytes > stride || samples.len() < expected_min {
        return Err(Error::image("pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width_px * height_px * 4);
    for row in samples.chunks(stride).take(height_px) {
        for px in row[..row_bytes].chunks_exact(n) {
            if n == 3 {
                out.extend_from_slice(px);
                out.push(u8::MAX);
            } else {
                out.extend_from_slice(&unpremultiply([px[0], px[1], px[2], px[3]]));
            }
        }
    }

    RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| Error::image("pixel buffer does not match raster size"))
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    match a {
        0 => [0, 0, 0, 0],
        u8::MAX => [r, g, b, a],
        _ => {
            let alpha = u16::from(a);
            let straighten = |c: u8| ((u16::from(c) * 255 + alpha / 2) / alpha).min(255) as u8;
            [straighten(r), straighten(g), straighten(b), a]
        }
    }
}
