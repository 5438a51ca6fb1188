//! Rendering-engine seam
//!
//! The façade never talks to a PDF interpreter directly. Everything it needs
//! from one (context allocation, opening a document from memory, page loading,
//! display lists, rasterization, text search, links and outlines) goes through
//! the traits in this module. Native results cross the seam as the plain data
//! types below, still in engine page space (72 units per inch, y down).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// MIME type declared when opening a document stream
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Upper bound for the engine's resource cache
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheLimit {
    #[default]
    Unbounded,
    Bytes(usize),
}

impl CacheLimit {
    /// Interpret a raw byte count, where 0 means no limit
    #[must_use]
    pub const fn from_bytes(bytes: usize) -> Self {
        if bytes == 0 {
            Self::Unbounded
        } else {
            Self::Bytes(bytes)
        }
    }

    #[must_use]
    pub const fn as_bytes(self) -> usize {
        match self {
            Self::Unbounded => 0,
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Errors reported by the rendering engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[cfg(feature = "mupdf")]
    #[error("MuPDF: {0}")]
    Mupdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NativePoint {
    pub x: f32,
    pub y: f32,
}

impl NativePoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in engine page space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl NativeRect {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Four-corner search hit region. Corners are named by their logical
/// position in the text run, which is not the on-page position once the
/// text is rotated or skewed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub ul: NativePoint,
    pub ur: NativePoint,
    pub ll: NativePoint,
    pub lr: NativePoint,
}

impl Quad {
    /// Axis-aligned quad covering `rect`
    #[must_use]
    pub const fn from_rect(rect: NativeRect) -> Self {
        Self {
            ul: NativePoint::new(rect.x0, rect.y0),
            ur: NativePoint::new(rect.x1, rect.y0),
            ll: NativePoint::new(rect.x0, rect.y1),
            lr: NativePoint::new(rect.x1, rect.y1),
        }
    }

    #[must_use]
    pub const fn corners(&self) -> [NativePoint; 4] {
        [self.ul, self.ur, self.ll, self.lr]
    }
}

/// One entry of a page's link list, as the engine reports it
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeLink {
    pub bounds: NativeRect,
    /// Raw link URI; intra-document targets start with `#`
    pub uri: String,
}

/// Node of the engine's outline tree
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeOutline {
    pub title: Option<String>,
    /// Target page (0-indexed), if the engine could resolve one
    pub page: Option<usize>,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub down: Vec<NativeOutline>,
}

/// Raster produced from a display list
#[derive(Clone, Debug, Default)]
pub struct NativePixmap {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, at least `width * components`
    pub stride: usize,
    /// Bytes per pixel (3 for RGB, 4 for premultiplied RGBA)
    pub components: usize,
    pub samples: Vec<u8>,
}

/// An allocated engine context.
///
/// Contexts are not safe for concurrent use; the owning
/// [`Document`](super::Document) serializes every call.
pub trait RenderContext: Sized + Send {
    type Stream;
    type Document: EngineDocument;

    /// Allocate a context and register the document handlers
    fn new(cache: CacheLimit) -> Result<Self, EngineError>;

    /// Open a read stream over an engine-owned copy of the input
    fn open_memory(&self, data: Arc<Vec<u8>>) -> Result<Self::Stream, EngineError>;

    fn open_document(
        &self,
        stream: &Self::Stream,
        mime_type: &str,
    ) -> Result<Self::Document, EngineError>;
}

pub trait EngineDocument: Send {
    type Page: EnginePage;

    fn needs_password(&self) -> Result<bool, EngineError>;

    /// Returns the raw authentication bitmask, 0 on failure
    fn authenticate(&mut self, password: &str) -> Result<u32, EngineError>;

    fn page_count(&self) -> Result<usize, EngineError>;

    fn load_page(&self, index: usize) -> Result<Self::Page, EngineError>;

    /// `Ok(None)` when the document carries no outline
    fn load_outline(&self) -> Result<Option<Vec<NativeOutline>>, EngineError>;
}

pub trait EnginePage {
    type DisplayList: EngineDisplayList;

    /// Untransformed page box
    fn bounds(&self) -> Result<NativeRect, EngineError>;

    /// Record the page once into a scale-independent display list
    fn display_list(&self) -> Result<Self::DisplayList, EngineError>;

    fn load_links(&self) -> Result<Vec<NativeLink>, EngineError>;
}

pub trait EngineDisplayList {
    /// Rasterize under a uniform scale transform with an opaque background
    fn rasterize(&self, scale: f32) -> Result<NativePixmap, EngineError>;

    /// Up to `max_hits` hit quads for `needle`
    fn search(&self, needle: &str, max_hits: usize) -> Result<Vec<Quad>, EngineError>;
}
