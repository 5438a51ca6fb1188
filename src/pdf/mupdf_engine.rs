//! MuPDF-backed rendering engine

use std::sync::Arc;

use log::debug;
use mupdf::{Colorspace, DestinationKind, DisplayList, Document as MuDocument, Matrix, Page};

use super::document::Document;
use super::engine::{
    CacheLimit, EngineDisplayList, EngineDocument, EngineError, EnginePage, NativeLink,
    NativeOutline, NativePixmap, NativePoint, NativeRect, Quad, RenderContext,
};

/// A PDF document rendered through MuPDF
pub type PdfDocument = Document<MupdfContext>;

/// MuPDF keeps its `fz_context` per thread inside the bindings; this type
/// carries the settings applied to documents opened through it.
///
/// The bindings expose no way to size the resource store, so the
/// [`CacheLimit`] is recorded and logged but MuPDF keeps its own default.
/// For the same reason [`RenderContext::new`] never fails here and
/// [`Error::ContextAllocationFailed`](super::Error::ContextAllocationFailed)
/// only comes from backends that own their context.
#[derive(Debug)]
pub struct MupdfContext {
    cache: CacheLimit,
}

impl RenderContext for MupdfContext {
    type Stream = Arc<Vec<u8>>;
    type Document = MupdfDocument;

    fn new(cache: CacheLimit) -> Result<Self, EngineError> {
        debug!("MuPDF context ready (cache limit {cache:?})");
        Ok(Self { cache })
    }

    fn open_memory(&self, data: Arc<Vec<u8>>) -> Result<Self::Stream, EngineError> {
        Ok(data)
    }

    fn open_document(
        &self,
        stream: &Self::Stream,
        mime_type: &str,
    ) -> Result<MupdfDocument, EngineError> {
        debug!(
            "Opening {} byte document (cache limit {:?})",
            stream.len(),
            self.cache
        );
        // from_bytes copies the slice into a MuPDF buffer, so the input is
        // held twice while the document is open: here and in `Resources`
        let inner = MuDocument::from_bytes(stream.as_slice(), mime_type)?;
        Ok(MupdfDocument { inner })
    }
}

pub struct MupdfDocument {
    inner: MuDocument,
}

// SAFETY: MuPDF documents are not thread-safe, but they are not tied to the
// thread that opened them either. A `MupdfDocument` only ever lives inside a
// `Document`, whose mutex guarantees that one thread at a time touches it and
// every page or display list derived from it.
unsafe impl Send for MupdfDocument {}

impl EngineDocument for MupdfDocument {
    type Page = Page;

    fn needs_password(&self) -> Result<bool, EngineError> {
        Ok(self.inner.needs_password()?)
    }

    fn authenticate(&mut self, password: &str) -> Result<u32, EngineError> {
        if !self.inner.needs_password()? {
            return Ok(1);
        }
        // The bindings only report success, not which password matched
        Ok(if self.inner.authenticate(password)? { 2 } else { 0 })
    }

    fn page_count(&self) -> Result<usize, EngineError> {
        let count = self.inner.page_count()?;
        usize::try_from(count).map_err(|_| EngineError::generic(format!("bad page count {count}")))
    }

    fn load_page(&self, index: usize) -> Result<Page, EngineError> {
        let index = i32::try_from(index)
            .map_err(|_| EngineError::generic(format!("page index {index} too large")))?;
        Ok(self.inner.load_page(index)?)
    }

    fn load_outline(&self) -> Result<Option<Vec<NativeOutline>>, EngineError> {
        let outlines = self.inner.outlines()?;
        if outlines.is_empty() {
            return Ok(None);
        }
        Ok(Some(convert_outlines(&outlines)))
    }
}

fn convert_outlines(outlines: &[mupdf::Outline]) -> Vec<NativeOutline> {
    outlines
        .iter()
        .map(|outline| {
            let (page, x, y) = match &outline.dest {
                Some(dest) => {
                    let (x, y) = destination_point(&dest.kind);
                    (Some(dest.loc.page_number as usize), x, y)
                }
                None => (None, 0.0, 0.0),
            };
            NativeOutline {
                title: Some(outline.title.clone()),
                page,
                x,
                y,
                down: convert_outlines(&outline.down),
            }
        })
        .collect()
}

/// Upper-left point a destination scrolls to; coordinates the view leaves
/// unspecified become 0
fn destination_point(kind: &DestinationKind) -> (f32, f32) {
    let (x, y) = match kind {
        DestinationKind::Fit | DestinationKind::FitB => (0.0, 0.0),
        DestinationKind::FitH { top } | DestinationKind::FitBH { top } => (0.0, *top),
        DestinationKind::FitV { left } | DestinationKind::FitBV { left } => (*left, 0.0),
        DestinationKind::FitR { left, top, .. } => (*left, *top),
        DestinationKind::XYZ { left, top, .. } => (left.unwrap_or(0.0), top.unwrap_or(0.0)),
    };
    let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
    (finite(x), finite(y))
}

fn native_rect(rect: mupdf::Rect) -> NativeRect {
    NativeRect::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

fn native_point(point: mupdf::Point) -> NativePoint {
    NativePoint::new(point.x, point.y)
}

impl EnginePage for Page {
    type DisplayList = DisplayList;

    fn bounds(&self) -> Result<NativeRect, EngineError> {
        Ok(native_rect(Page::bounds(self)?))
    }

    fn display_list(&self) -> Result<DisplayList, EngineError> {
        Ok(self.to_display_list(false)?)
    }

    fn load_links(&self) -> Result<Vec<NativeLink>, EngineError> {
        let links = self
            .links()?
            .map(|link| {
                let uri = match link.dest {
                    Some(dest) if link.uri.is_empty() => {
                        format!("#page={}", dest.loc.page_number + 1)
                    }
                    _ => link.uri.clone(),
                };
                NativeLink {
                    bounds: native_rect(link.bounds),
                    uri,
                }
            })
            .collect();
        Ok(links)
    }
}

impl EngineDisplayList for DisplayList {
    fn rasterize(&self, scale: f32) -> Result<NativePixmap, EngineError> {
        let rgb = Colorspace::device_rgb();
        let pixmap = self.to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false)?;
        Ok(NativePixmap {
            width: pixmap.width(),
            height: pixmap.height(),
            stride: pixmap.stride() as usize,
            components: pixmap.n() as usize,
            samples: pixmap.samples().to_vec(),
        })
    }

    fn search(&self, needle: &str, max_hits: usize) -> Result<Vec<Quad>, EngineError> {
        let hit_max = u32::try_from(max_hits).unwrap_or(u32::MAX);
        let quads = DisplayList::search(self, needle, hit_max)?;
        Ok(quads
            .iter()
            .map(|q| Quad {
                ul: native_point(q.ul),
                ur: native_point(q.ur),
                ll: native_point(q.ll),
                lr: native_point(q.lr),
            })
            .collect())
    }
}
