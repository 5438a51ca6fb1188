//! PDF table of contents structures and extraction helpers.

use log::warn;
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::engine::{EngineDocument, NativeOutline, RenderContext};
use super::error::Result;
use super::scale::checked_scale_from_dpi;

/// A single entry in the table of contents
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Display title, printable characters only
    pub title: String,
    /// Target page (0-indexed), when the outline entry resolves to one
    pub page_number: Option<usize>,
    /// Target point in pixels at the requested DPI
    pub page_x: i32,
    pub page_y: i32,
    /// Nested entries, in document order
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// This entry followed by all of its descendants, depth-first
    pub fn walk(&self) -> TocWalk<'_> {
        TocWalk { stack: vec![self] }
    }
}

/// Pre-order traversal over every entry of `entries` and their descendants
pub fn flatten(entries: &[TocEntry]) -> TocWalk<'_> {
    TocWalk {
        stack: entries.iter().rev().collect(),
    }
}

/// Depth-first pre-order iterator over TOC entries
pub struct TocWalk<'a> {
    stack: Vec<&'a TocEntry>,
}

impl<'a> Iterator for TocWalk<'a> {
    type Item = &'a TocEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.stack.extend(entry.children.iter().rev());
        Some(entry)
    }
}

impl<C: RenderContext> Document<C> {
    /// Outline of the document with target points scaled for `dpi`.
    /// A document without an outline yields an empty list.
    pub fn table_of_contents(&self, dpi: f32) -> Result<Vec<TocEntry>> {
        let scale = checked_scale_from_dpi(dpi)?;
        self.with_resources(|resources| {
            let outline = match resources.document.load_outline() {
                Ok(Some(outline)) => outline,
                Ok(None) => return Ok(Vec::new()),
                Err(e) => {
                    warn!("Unable to load document outline: {e}");
                    return Ok(Vec::new());
                }
            };
            Ok(build_toc(&outline, scale))
        })
    }
}

/// Convert a native outline level (and, recursively, its children)
pub fn build_toc(outline: &[NativeOutline], scale: f32) -> Vec<TocEntry> {
    outline
        .iter()
        .map(|node| TocEntry {
            title: node.title.as_deref().map(sanitize_title).unwrap_or_default(),
            page_number: node.page,
            page_x: (node.x * scale).floor() as i32,
            page_y: (node.y * scale).floor() as i32,
            children: build_toc(&node.down, scale),
        })
        .collect()
}

/// Drop control and other non-printable characters, then trim
#[must_use]
pub fn sanitize_title(raw: &str) -> String {
    let printable: String = raw.chars().filter(|&c| is_printable(c)).collect();
    printable.trim().to_string()
}

/// Everything except controls, non-space whitespace, format characters
/// (general category Cf), private-use code points and noncharacters.
/// Unassigned code points pass; there is no category table to test them.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !(is_format(c) || is_private_use(c) || is_noncharacter(c))
}

fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

fn is_noncharacter(c: char) -> bool {
    let c = u32::from(c);
    (0xFDD0..=0xFDEF).contains(&c) || c & 0xFFFE == 0xFFFE
}
