//! Page link extraction and classification

use log::warn;

use super::engine::{EnginePage, NativeLink};
use super::types::{LinkTarget, PageLink, PixelRect};

/// Marker preceding the 1-based page number in intra-document URIs
const PAGE_MARKER: &str = "#page=";

/// Collect the links of `page`, scaled into pixel space. Links without a
/// usable target are dropped.
pub fn load_links<P: EnginePage>(page: &P, scale: f32) -> Vec<PageLink> {
    let links = match page.load_links() {
        Ok(links) => links,
        Err(e) => {
            warn!("Unable to load page links: {e}");
            return Vec::new();
        }
    };

    links
        .iter()
        .filter_map(|link| scale_link(link, scale))
        .collect()
}

fn scale_link(link: &NativeLink, scale: f32) -> Option<PageLink> {
    let target = classify_uri(&link.uri)?;
    let rect = link.bounds;
    let bounds = PixelRect::covering(
        rect.x0.min(rect.x1),
        rect.y0.min(rect.y1),
        rect.x0.max(rect.x1),
        rect.y0.max(rect.y1),
        scale,
    );
    Some(PageLink { bounds, target })
}

/// Classify a raw link URI.
///
/// URIs starting with `#` point into the document. Their page comes from the
/// `#page=N` fragment (1-based, terminated by `&` or the end). A payload that
/// is not a number resolves to page 0; a fragment without the marker, or
/// `#page=0`, has no target. Any other non-empty URI is external.
#[must_use]
pub fn classify_uri(uri: &str) -> Option<LinkTarget> {
    if uri.starts_with('#') {
        let start = uri.find(PAGE_MARKER)? + PAGE_MARKER.len();
        let payload = uri[start..].split('&').next().unwrap_or_default();
        let page = match payload.parse::<usize>() {
            Ok(number) => number.checked_sub(1)?,
            Err(_) => 0,
        };
        Some(LinkTarget::Internal { page })
    } else if !uri.is_empty() {
        Some(LinkTarget::External {
            uri: uri.to_string(),
        })
    } else {
        None
    }
}
