//! Owning handle over an engine context, an opened document and its input buffer
//!
//! The engine context is not thread-safe, not even for reads: it carries
//! mutable caches. A [`Document`] therefore keeps everything the engine owns
//! behind one mutex and holds it for the full duration of every operation,
//! native calls and post-processing alike. Distinct documents share nothing
//! and run in parallel.
//!
//! Teardown is explicit through [`Document::release`], which is idempotent.
//! `Drop` runs the same path as a safety net. Any call after release fails
//! with [`Error::Released`] instead of touching freed engine state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::engine::{CacheLimit, EngineDocument, EnginePage, PDF_MIME_TYPE, RenderContext};
use super::error::{Error, Result};

/// Leading bytes of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Engine-owned state of an open document.
///
/// Field order matches the teardown order: the document goes first, then the
/// input copy it reads from, then the context backing both.
pub(crate) struct Resources<C: RenderContext> {
    pub(crate) document: C::Document,
    pub(crate) buffer: Arc<Vec<u8>>,
    pub(crate) context: C,
}

impl<C: RenderContext> Resources<C> {
    fn release(self) {
        let Self {
            document,
            buffer,
            context,
        } = self;
        drop(document);
        drop(buffer);
        drop(context);
    }

    pub(crate) fn page_count(&self) -> Result<usize> {
        self.document
            .page_count()
            .map_err(|e| Error::internal(format!("unable to count pages: {e}")))
    }

    /// Page count, or [`Error::InvalidPageNumber`] when `page` is out of range
    pub(crate) fn check_page(&self, page: usize) -> Result<usize> {
        let page_count = self.page_count()?;
        if page >= page_count {
            return Err(Error::InvalidPageNumber { page, page_count });
        }
        Ok(page_count)
    }
}

/// A PDF document opened from an in-memory buffer
pub struct Document<C: RenderContext> {
    resources: Mutex<Option<Resources<C>>>,
}

impl<C: RenderContext> Document<C> {
    /// Open a document from raw bytes.
    ///
    /// The bytes are copied; the caller's buffer is not retained. Every
    /// resource acquired before a failing step is released before the error
    /// is returned.
    ///
    /// `cache` is handed to the engine context. Whether it bounds anything
    /// is up to the backend: the mock engine records it, while the MuPDF
    /// backend has no way to apply it and keeps MuPDF's default store.
    pub fn open(bytes: &[u8], cache: CacheLimit) -> Result<Self> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(Error::NotPdfData);
        }

        let context = C::new(cache).map_err(Error::ContextAllocationFailed)?;
        let buffer = copy_buffer(bytes)?;

        let stream = context
            .open_memory(Arc::clone(&buffer))
            .map_err(|e| Error::internal(format!("unable to allocate internal stream: {e}")))?;
        let document = context.open_document(&stream, PDF_MIME_TYPE);
        drop(stream);
        let document = document.map_err(Error::DocumentOpenFailed)?;

        debug!(
            "Opened PDF document ({} bytes, cache limit {:?})",
            buffer.len(),
            cache
        );

        Ok(Self {
            resources: Mutex::new(Some(Resources {
                document,
                buffer,
                context,
            })),
        })
    }

    /// Release the engine document, the input copy and the context, in that
    /// order. Waits for any in-flight operation; later calls are no-ops.
    pub fn release(&self) {
        let mut guard = self.lock();
        if let Some(resources) = guard.take() {
            resources.release();
            debug!("Released PDF document");
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.lock().is_none()
    }

    /// Total number of pages in the document
    pub fn page_count(&self) -> Result<usize> {
        self.with_resources(|resources| resources.page_count())
    }

    /// Untransformed width and height of `page`, in 72-per-inch units
    pub fn page_size(&self, page: usize) -> Result<(f32, f32)> {
        self.with_resources(|resources| {
            resources.check_page(page)?;
            let loaded = resources
                .document
                .load_page(page)
                .map_err(|source| Error::PageLoadFailed { page, source })?;
            let bounds = loaded
                .bounds()
                .map_err(|source| Error::PageLoadFailed { page, source })?;
            Ok((bounds.width(), bounds.height()))
        })
    }

    /// Run `f` against the live resources while holding the document lock
    pub(crate) fn with_resources<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Resources<C>) -> Result<R>,
    {
        let mut guard = self.lock();
        let resources = guard.as_mut().ok_or(Error::Released)?;
        f(resources)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Resources<C>>> {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: RenderContext> Drop for Document<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: RenderContext> std::fmt::Debug for Document<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("Document");
        match self.resources.try_lock() {
            Ok(guard) => out
                .field("released", &guard.is_none())
                .field("buffer_len", &guard.as_ref().map(|r| r.buffer.len())),
            Err(_) => out.field("busy", &true),
        };
        out.finish_non_exhaustive()
    }
}

/// Private copy of the input that backs the engine stream for the life of
/// the document. An engine that copies again on open (MuPDF does) holds
/// the bytes twice until release.
fn copy_buffer(bytes: &[u8]) -> Result<Arc<Vec<u8>>> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())
        .map_err(|e| Error::internal(format!("unable to allocate internal buffer: {e}")))?;
    copy.extend_from_slice(bytes);
    Ok(Arc::new(copy))
}
