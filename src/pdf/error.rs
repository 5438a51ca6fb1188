//! Errors surfaced by the document façade

use super::engine::EngineError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of document operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("only PDF documents are supported")]
    NotPdfData,

    #[error("unable to allocate PDF context: {0}")]
    ContextAllocationFailed(#[source] EngineError),

    #[error("internal error: {detail}")]
    InternalError { detail: String },

    #[error("unable to open PDF: {0}")]
    DocumentOpenFailed(#[source] EngineError),

    #[error("page number {page} is out of range (0-{page_count})")]
    InvalidPageNumber { page: usize, page_count: usize },

    #[error("unable to load page {page}: {source}")]
    PageLoadFailed {
        page: usize,
        #[source]
        source: EngineError,
    },

    #[error("unable to create image: {detail}")]
    ImageCreationFailed { detail: String },

    #[error("invalid page size {width}x{height}")]
    InvalidPageSize { width: f32, height: f32 },

    #[error("invalid resolution {dpi} dpi")]
    InvalidDpi { dpi: f32 },

    #[error("document handle has been released")]
    Released,
}

impl Error {
    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError { detail: msg.into() }
    }

    pub(crate) fn image(msg: impl Into<String>) -> Self {
        Self::ImageCreationFailed { detail: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_message_names_bounds() {
        let err = Error::InvalidPageNumber {
            page: 2,
            page_count: 2,
        };
        assert_eq!(err.to_string(), "page number 2 is out of range (0-2)");
    }

    #[test]
    fn page_load_failure_keeps_engine_source() {
        let err = Error::PageLoadFailed {
            page: 0,
            source: EngineError::generic("broken xref"),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("broken xref"));
    }
}
