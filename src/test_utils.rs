//! In-memory rendering engine for tests.
//!
//! A mock "PDF" is the usual `%PDF` header followed by a JSON description of
//! its pages, outline and passwords (see [`MockPdf`]). Every engine object
//! counts its creation and teardown in per-thread [`MockStats`], so tests can
//! check that nothing leaks on any path.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pdf::engine::{
    CacheLimit, EngineDisplayList, EngineDocument, EngineError, EnginePage, NativeLink,
    NativeOutline, NativePixmap, NativeRect, Quad, RenderContext,
};

const MOCK_HEADER: &str = "%PDF-1.7\n%mock\n";

/// Engine calls that can be told to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailPoint {
    PageCount,
    LoadPage,
    Bounds,
    DisplayList,
    Rasterize,
    /// Rasterize succeeds but returns fewer samples than the stride claims
    TruncatedPixmap,
    Search,
    Links,
    Outline,
    NeedsPassword,
    Authenticate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockEvent {
    ContextCreated,
    StreamOpened,
    StreamDropped,
    DocumentOpened,
    DocumentDropped,
    ContextDropped,
}

#[derive(Clone, Debug, Default)]
pub struct MockStats {
    pub contexts_created: usize,
    pub contexts_dropped: usize,
    pub streams_opened: usize,
    pub streams_dropped: usize,
    pub documents_opened: usize,
    pub documents_dropped: usize,
    pub pages_loaded: usize,
    pub pages_dropped: usize,
    pub display_lists_created: usize,
    pub display_lists_dropped: usize,
    pub searches: usize,
    pub last_cache_limit: Option<CacheLimit>,
    pub events: Vec<MockEvent>,
}

thread_local! {
    static STATS: RefCell<MockStats> = RefCell::new(MockStats::default());
    static FAIL_CONTEXT: Cell<bool> = const { Cell::new(false) };
    static FAIL_STREAM: Cell<bool> = const { Cell::new(false) };
}

/// Snapshot of the current thread's counters
pub fn mock_stats() -> MockStats {
    STATS.with(|stats| stats.borrow().clone())
}

pub fn reset_mock_stats() {
    STATS.with(|stats| *stats.borrow_mut() = MockStats::default());
    FAIL_CONTEXT.with(|flag| flag.set(false));
    FAIL_STREAM.with(|flag| flag.set(false));
}

/// Make the next context allocation on this thread fail
pub fn fail_next_context() {
    FAIL_CONTEXT.with(|flag| flag.set(true));
}

/// Make the next stream allocation on this thread fail
pub fn fail_next_stream() {
    FAIL_STREAM.with(|flag| flag.set(true));
}

fn record(event: MockEvent) {
    STATS.with(|stats| {
        let mut stats = stats.borrow_mut();
        match event {
            MockEvent::ContextCreated => stats.contexts_created += 1,
            MockEvent::StreamOpened => stats.streams_opened += 1,
            MockEvent::StreamDropped => stats.streams_dropped += 1,
            MockEvent::DocumentOpened => stats.documents_opened += 1,
            MockEvent::DocumentDropped => stats.documents_dropped += 1,
            MockEvent::ContextDropped => stats.contexts_dropped += 1,
        }
        stats.events.push(event);
    });
}

fn bump(update: impl FnOnce(&mut MockStats)) {
    STATS.with(|stats| update(&mut stats.borrow_mut()));
}

/// A run of text placed on a page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MockText {
    pub text: String,
    pub quad: Quad,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MockPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub links: Vec<NativeLink>,
    #[serde(default)]
    pub text: Vec<MockText>,
    /// Bytes per rasterized pixel: 3 (RGB) or 4 (premultiplied RGBA)
    pub components: usize,
    /// Extra bytes at the end of every raster row
    #[serde(default)]
    pub stride_padding: usize,
}

impl MockPage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            links: Vec::new(),
            text: Vec::new(),
            components: 3,
            stride_padding: 0,
        }
    }

    pub fn link(mut self, bounds: NativeRect, uri: &str) -> Self {
        self.links.push(NativeLink {
            bounds,
            uri: uri.to_string(),
        });
        self
    }

    /// Place `text` in the axis-aligned box `bounds`
    pub fn text(self, text: &str, bounds: NativeRect) -> Self {
        self.text_quad(text, Quad::from_rect(bounds))
    }

    pub fn text_quad(mut self, text: &str, quad: Quad) -> Self {
        self.text.push(MockText {
            text: text.to_string(),
            quad,
        });
        self
    }

    pub fn components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    pub fn stride_padding(mut self, padding: usize) -> Self {
        self.stride_padding = padding;
        self
    }
}

/// Description of a mock document; serialized into the bytes handed to
/// [`Document::open`](crate::Document::open)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MockPdf {
    pub pages: Vec<MockPage>,
    #[serde(default)]
    pub outline: Option<Vec<NativeOutline>>,
    #[serde(default)]
    pub user_password: Option<String>,
    #[serde(default)]
    pub owner_password: Option<String>,
    #[serde(default)]
    pub failures: Vec<FailPoint>,
}

impl MockPdf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: MockPage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn outline(mut self, outline: Vec<NativeOutline>) -> Self {
        self.outline = Some(outline);
        self
    }

    pub fn passwords(mut self, user: Option<&str>, owner: Option<&str>) -> Self {
        self.user_password = user.map(str::to_string);
        self.owner_password = owner.map(str::to_string);
        self
    }

    pub fn fail(mut self, point: FailPoint) -> Self {
        self.failures.push(point);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = MOCK_HEADER.as_bytes().to_vec();
        let body = serde_json::to_vec(self).expect("mock pdf serializes");
        bytes.extend_from_slice(&body);
        bytes
    }

    fn parse(data: &[u8]) -> Result<Self, EngineError> {
        let start = data
            .iter()
            .position(|&b| b == b'{')
            .ok_or_else(|| EngineError::generic("no document body"))?;
        serde_json::from_slice(&data[start..])
            .map_err(|e| EngineError::generic(format!("malformed document: {e}")))
    }

    fn fails(&self, point: FailPoint) -> bool {
        self.failures.contains(&point)
    }
}

fn injected(point: FailPoint) -> EngineError {
    EngineError::generic(format!("injected failure: {point:?}"))
}

#[derive(Debug)]
pub struct MockContext {
    cache: CacheLimit,
}

impl MockContext {
    pub fn cache_limit(&self) -> CacheLimit {
        self.cache
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        record(MockEvent::ContextDropped);
    }
}

impl RenderContext for MockContext {
    type Stream = MockStream;
    type Document = MockDocument;

    fn new(cache: CacheLimit) -> Result<Self, EngineError> {
        if FAIL_CONTEXT.with(|flag| flag.replace(false)) {
            return Err(EngineError::generic("out of memory"));
        }
        record(MockEvent::ContextCreated);
        bump(|stats| stats.last_cache_limit = Some(cache));
        Ok(Self { cache })
    }

    fn open_memory(&self, data: Arc<Vec<u8>>) -> Result<MockStream, EngineError> {
        if FAIL_STREAM.with(|flag| flag.replace(false)) {
            return Err(EngineError::generic("out of memory"));
        }
        record(MockEvent::StreamOpened);
        Ok(MockStream { data })
    }

    fn open_document(
        &self,
        stream: &MockStream,
        _mime_type: &str,
    ) -> Result<MockDocument, EngineError> {
        let pdf = MockPdf::parse(&stream.data)?;
        record(MockEvent::DocumentOpened);
        Ok(MockDocument { pdf: Arc::new(pdf) })
    }
}

pub struct MockStream {
    data: Arc<Vec<u8>>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        record(MockEvent::StreamDropped);
    }
}

pub struct MockDocument {
    pdf: Arc<MockPdf>,
}

impl Drop for MockDocument {
    fn drop(&mut self) {
        record(MockEvent::DocumentDropped);
    }
}

impl EngineDocument for MockDocument {
    type Page = MockLoadedPage;

    fn needs_password(&self) -> Result<bool, EngineError> {
        if self.pdf.fails(FailPoint::NeedsPassword) {
            return Err(injected(FailPoint::NeedsPassword));
        }
        Ok(self
            .pdf
            .user_password
            .as_deref()
            .is_some_and(|pw| !pw.is_empty()))
    }

    fn authenticate(&mut self, password: &str) -> Result<u32, EngineError> {
        if self.pdf.fails(FailPoint::Authenticate) {
            return Err(injected(FailPoint::Authenticate));
        }
        let user = self.pdf.user_password.as_deref();
        let owner = self.pdf.owner_password.as_deref();
        if user.is_none() && owner.is_none() {
            return Ok(1);
        }
        let mut bits = 0;
        if user == Some(password) {
            bits |= 2;
        }
        if owner == Some(password) {
            bits |= 4;
        }
        Ok(bits)
    }

    fn page_count(&self) -> Result<usize, EngineError> {
        if self.pdf.fails(FailPoint::PageCount) {
            return Err(injected(FailPoint::PageCount));
        }
        Ok(self.pdf.pages.len())
    }

    fn load_page(&self, index: usize) -> Result<MockLoadedPage, EngineError> {
        if self.pdf.fails(FailPoint::LoadPage) {
            return Err(injected(FailPoint::LoadPage));
        }
        if index >= self.pdf.pages.len() {
            return Err(EngineError::generic(format!("no page {index}")));
        }
        bump(|stats| stats.pages_loaded += 1);
        Ok(MockLoadedPage {
            pdf: Arc::clone(&self.pdf),
            index,
        })
    }

    fn load_outline(&self) -> Result<Option<Vec<NativeOutline>>, EngineError> {
        if self.pdf.fails(FailPoint::Outline) {
            return Err(injected(FailPoint::Outline));
        }
        Ok(self.pdf.outline.clone())
    }
}

pub struct MockLoadedPage {
    pdf: Arc<MockPdf>,
    index: usize,
}

impl MockLoadedPage {
    fn page(&self) -> &MockPage {
        &self.pdf.pages[self.index]
    }
}

impl Drop for MockLoadedPage {
    fn drop(&mut self) {
        bump(|stats| stats.pages_dropped += 1);
    }
}

impl EnginePage for MockLoadedPage {
    type DisplayList = MockDisplayList;

    fn bounds(&self) -> Result<NativeRect, EngineError> {
        if self.pdf.fails(FailPoint::Bounds) {
            return Err(injected(FailPoint::Bounds));
        }
        let page = self.page();
        Ok(NativeRect::new(0.0, 0.0, page.width, page.height))
    }

    fn display_list(&self) -> Result<MockDisplayList, EngineError> {
        if self.pdf.fails(FailPoint::DisplayList) {
            return Err(injected(FailPoint::DisplayList));
        }
        bump(|stats| stats.display_lists_created += 1);
        Ok(MockDisplayList {
            pdf: Arc::clone(&self.pdf),
            index: self.index,
        })
    }

    fn load_links(&self) -> Result<Vec<NativeLink>, EngineError> {
        if self.pdf.fails(FailPoint::Links) {
            return Err(injected(FailPoint::Links));
        }
        Ok(self.page().links.clone())
    }
}

pub struct MockDisplayList {
    pdf: Arc<MockPdf>,
    index: usize,
}

impl Drop for MockDisplayList {
    fn drop(&mut self) {
        bump(|stats| stats.display_lists_dropped += 1);
    }
}

impl EngineDisplayList for MockDisplayList {
    fn rasterize(&self, scale: f32) -> Result<NativePixmap, EngineError> {
        if self.pdf.fails(FailPoint::Rasterize) {
            return Err(injected(FailPoint::Rasterize));
        }
        let page = &self.pdf.pages[self.index];
        let width = raster_extent(page.width, scale);
        let height = raster_extent(page.height, scale);
        let stride = width as usize * page.components + page.stride_padding;
        let mut samples = vec![u8::MAX; stride * height as usize];
        if self.pdf.fails(FailPoint::TruncatedPixmap) {
            samples.truncate(samples.len() / 2);
        }
        Ok(NativePixmap {
            width,
            height,
            stride,
            components: page.components,
            samples,
        })
    }

    fn search(&self, needle: &str, max_hits: usize) -> Result<Vec<Quad>, EngineError> {
        bump(|stats| stats.searches += 1);
        if self.pdf.fails(FailPoint::Search) {
            return Err(injected(FailPoint::Search));
        }
        let needle = needle.to_lowercase();
        Ok(self.pdf.pages[self.index]
            .text
            .iter()
            .filter(|run| run.text.to_lowercase().contains(&needle))
            .map(|run| run.quad)
            .take(max_hits)
            .collect())
    }
}

/// Pixel extent of a page edge, rounded up with a small tolerance
fn raster_extent(points: f32, scale: f32) -> u32 {
    let extent = (points * scale - 0.001).ceil();
    if extent.is_finite() && extent > 0.0 {
        extent as u32
    } else {
        0
    }
}
