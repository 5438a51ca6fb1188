//! PDF rendering infrastructure

mod auth;
mod document;
pub mod engine;
mod error;
mod links;
#[cfg(feature = "mupdf")]
mod mupdf_engine;
mod outline;
mod render;
mod scale;
mod search;
mod types;

pub use auth::AuthenticationStatus;
pub use document::{Document, PDF_MAGIC};
pub use engine::{CacheLimit, EngineError};
pub use error::{Error, Result};
pub use links::{classify_uri, load_links};
#[cfg(feature = "mupdf")]
pub use mupdf_engine::{MupdfContext, PdfDocument};
pub use outline::{TocEntry, TocWalk, build_toc, flatten, sanitize_title};
pub use scale::{
    MAX_DPI_SCALE, NATIVE_DPI, ScaleRequest, checked_scale_from_dpi, scale_from_dpi, scale_from_fit,
};
pub use search::{quad_to_rect, search_hits};
pub use types::*;
