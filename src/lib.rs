pub mod pdf;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the document façade
pub use pdf::{
    AuthenticationStatus, CacheLimit, Document, Error, LinkTarget, PageLink, PixelRect,
    RenderedPage, Result, ScaleRequest, TocEntry,
};
#[cfg(feature = "mupdf")]
pub use pdf::{MupdfContext, PdfDocument};
