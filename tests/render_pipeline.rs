use image::Rgba;
use pdfraster::pdf::engine::{NativePoint, NativeRect, Quad};
use pdfraster::test_utils::{FailPoint, MockContext, MockPage, MockPdf, mock_stats, reset_mock_stats};
use pdfraster::{CacheLimit, Document, Error, LinkTarget, PixelRect, ScaleRequest};

type MockDocument = Document<MockContext>;

const LETTER: (f32, f32) = (612.0, 792.0);
const A4: (f32, f32) = (595.0, 842.0);

fn open(pdf: MockPdf) -> MockDocument {
    MockDocument::open(&pdf.to_bytes(), CacheLimit::Unbounded).unwrap()
}

/// A page with nine "GURPS" runs, the first one at a known spot
fn gurps_page() -> MockPage {
    let mut page = MockPage::new(LETTER.0, LETTER.1)
        .text("GURPS", NativeRect::new(110.0, 130.0, 138.8, 139.5))
        .text("Generic Universal", NativeRect::new(110.0, 150.0, 200.0, 160.0));
    for row in 1..9 {
        let y = 200.0 + row as f32 * 20.0;
        page = page.text("the gurps rules", NativeRect::new(72.0, y, 160.0, y + 10.0));
    }
    page
}

#[test]
fn render_at_100_dpi_scales_the_native_box() {
    let doc = open(MockPdf::new().page(gurps_page()));
    let page = doc.render_page(0, 100.0, 20, "GURPS").unwrap();

    assert_eq!(page.width(), 850);
    assert_eq!(page.height(), 1100);
    assert_eq!(page.stride(), 850 * 4);
    assert_eq!(page.pixels().len(), 850 * 1100 * 4);
    assert_eq!(page.search_hits.len(), 9);
    assert_eq!(page.search_hits[0], PixelRect::new(152, 180, 193, 194));
}

#[test]
fn a4_raster_rounds_up() {
    let doc = open(MockPdf::new().page(MockPage::new(A4.0, A4.1)));
    let page = doc.render_page(0, 100.0, 20, "").unwrap();
    assert_eq!((page.width(), page.height()), (827, 1170));
    assert_eq!(page.stride(), 3308);
}

#[test]
fn hits_are_capped_by_max_hits() {
    let doc = open(MockPdf::new().page(gurps_page()));
    assert_eq!(doc.render_page(0, 72.0, 4, "gurps").unwrap().search_hits.len(), 4);
    assert!(doc.render_page(0, 72.0, 0, "gurps").unwrap().search_hits.is_empty());
}

#[test]
fn empty_needle_skips_the_engine_search() {
    reset_mock_stats();
    let doc = open(MockPdf::new().page(gurps_page()));
    let page = doc.render_page(0, 100.0, 20, "").unwrap();
    assert!(page.search_hits.is_empty());
    assert_eq!(mock_stats().searches, 0);
}

#[test]
fn no_match_is_not_an_error() {
    let doc = open(MockPdf::new().page(gurps_page()));
    let page = doc.render_page(0, 100.0, 20, "dragon").unwrap();
    assert!(page.search_hits.is_empty());
}

#[test]
fn rotated_hit_is_normalized() {
    // Text rotated by 90 degrees: the logical upper-left is at the bottom
    let quad = Quad {
        ul: NativePoint::new(100.0, 200.0),
        ur: NativePoint::new(100.0, 150.0),
        ll: NativePoint::new(110.0, 200.0),
        lr: NativePoint::new(110.0, 150.0),
    };
    let doc = open(MockPdf::new().page(MockPage::new(300.0, 300.0).text_quad("up", quad)));
    let hit = doc.render_page(0, 72.0, 5, "up").unwrap().search_hits[0];
    assert_eq!(hit, PixelRect::new(100, 150, 110, 200));
    assert!(hit.x0 <= hit.x1 && hit.y0 <= hit.y1);
}

#[test]
fn search_failure_degrades_to_no_hits() {
    let doc = open(MockPdf::new().page(gurps_page()).fail(FailPoint::Search));
    let page = doc.render_page(0, 100.0, 20, "GURPS").unwrap();
    assert!(page.search_hits.is_empty());
    assert_eq!(page.width(), 850);
}

#[test]
fn links_are_scaled_outward_and_classified() {
    let page = MockPage::new(LETTER.0, LETTER.1)
        .link(NativeRect::new(50.0, 117.5, 107.0, 129.5), "https://example.com/gurps")
        .link(NativeRect::new(10.0, 10.0, 20.0, 20.0), "#page=3&zoom=100")
        .link(NativeRect::new(30.0, 30.0, 40.0, 40.0), "#nameddest")
        .link(NativeRect::new(50.0, 50.0, 60.0, 60.0), "");
    let doc = open(MockPdf::new().page(page));
    let links = doc.render_page(0, 100.0, 0, "").unwrap().links;

    assert_eq!(links.len(), 2);
    assert_eq!(links[0].bounds, PixelRect::new(69, 163, 149, 180));
    assert_eq!(links[0].page_number(), -1);
    assert_eq!(links[0].uri(), "https://example.com/gurps");

    assert_eq!(links[1].target, LinkTarget::Internal { page: 2 });
    assert_eq!(links[1].page_number(), 2);
    assert_eq!(links[1].uri(), "");
}

#[test]
fn unparsable_page_reference_lands_on_first_page() {
    let page = MockPage::new(100.0, 100.0).link(NativeRect::new(0.0, 0.0, 5.0, 5.0), "#page=x");
    let doc = open(MockPdf::new().page(page));
    let links = doc.render_page(0, 72.0, 0, "").unwrap().links;
    assert_eq!(links[0].target, LinkTarget::Internal { page: 0 });
}

#[test]
fn link_failure_degrades_to_no_links() {
    let page = MockPage::new(100.0, 100.0).link(NativeRect::new(0.0, 0.0, 5.0, 5.0), "https://a");
    let doc = open(MockPdf::new().page(page).fail(FailPoint::Links));
    assert!(doc.render_page(0, 72.0, 0, "").unwrap().links.is_empty());
}

#[test]
fn fit_render_stays_within_bounds() {
    let doc = open(
        MockPdf::new()
            .page(MockPage::new(LETTER.0, LETTER.1))
            .page(MockPage::new(A4.0, A4.1))
            .page(MockPage::new(842.0, 595.0)),
    );
    for (max_w, max_h) in [(800.0, 600.0), (300.0, 1000.0), (1024.0, 1024.0)] {
        for page_num in 0..3 {
            let page = doc
                .render_page_for_size(page_num, max_w, max_h, 0, "")
                .unwrap();
            assert!(page.width() as f32 <= max_w, "{} > {max_w}", page.width());
            assert!(page.height() as f32 <= max_h, "{} > {max_h}", page.height());
        }
    }
}

#[test]
fn fit_with_zero_bounds_is_invalid_page_size() {
    let doc = open(MockPdf::new().page(MockPage::new(LETTER.0, LETTER.1)));
    assert!(matches!(
        doc.render_page_for_size(0, 0.0, 500.0, 0, ""),
        Err(Error::InvalidPageSize { .. })
    ));
}

#[test]
fn zero_sized_page_cannot_be_fit() {
    let doc = open(MockPdf::new().page(MockPage::new(0.0, 100.0)));
    assert!(matches!(
        doc.render(0, ScaleRequest::Fit { max_width: 100.0, max_height: 100.0 }, 0, ""),
        Err(Error::InvalidPageSize { .. })
    ));
}

#[test]
fn huge_dpi_is_clamped() {
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)));
    let page = doc.render_page(0, 72_000.0, 0, "").unwrap();
    assert_eq!(page.scale_factor, 10.0);
    assert_eq!((page.width(), page.height()), (100, 100));
}

#[test]
fn page_number_is_validated() {
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)));
    assert!(matches!(
        doc.render_page(1, 72.0, 0, ""),
        Err(Error::InvalidPageNumber { page: 1, page_count: 1 })
    ));
    assert!(matches!(
        doc.render_page(usize::MAX, 72.0, 0, ""),
        Err(Error::InvalidPageNumber { .. })
    ));
}

#[test]
fn page_load_failure_is_reported() {
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)).fail(FailPoint::LoadPage));
    assert!(matches!(
        doc.render_page(0, 72.0, 0, ""),
        Err(Error::PageLoadFailed { page: 0, .. })
    ));

    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)).fail(FailPoint::DisplayList));
    assert!(matches!(
        doc.render_page(0, 72.0, 0, ""),
        Err(Error::PageLoadFailed { page: 0, .. })
    ));
}

#[test]
fn raster_failures_are_image_errors() {
    for point in [FailPoint::Rasterize, FailPoint::TruncatedPixmap] {
        let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)).fail(point));
        assert!(
            matches!(doc.render_page(0, 72.0, 0, ""), Err(Error::ImageCreationFailed { .. })),
            "{point:?}"
        );
    }
}

#[test]
fn unusable_dpi_is_rejected_before_loading_the_page() {
    reset_mock_stats();
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)));
    for dpi in [0.0, -72.0, f32::NAN, f32::INFINITY] {
        assert!(
            matches!(doc.render_page(0, dpi, 0, ""), Err(Error::InvalidDpi { .. })),
            "{dpi} accepted"
        );
    }
    assert_eq!(mock_stats().pages_loaded, 0);
}

#[test]
fn nan_fit_bounds_are_invalid_page_size() {
    let doc = open(MockPdf::new().page(MockPage::new(LETTER.0, LETTER.1)));
    assert!(matches!(
        doc.render_page_for_size(0, f32::NAN, 500.0, 0, ""),
        Err(Error::InvalidPageSize { .. })
    ));
}

#[test]
fn raster_is_opaque_straight_rgba() {
    let doc = open(
        MockPdf::new()
            .page(MockPage::new(20.0, 10.0).stride_padding(7))
            .page(MockPage::new(20.0, 10.0).components(4)),
    );
    for page_num in 0..2 {
        let page = doc.render_page(page_num, 72.0, 0, "").unwrap();
        assert_eq!(page.pixels().len(), 20 * 10 * 4);
        assert!(page.pixels().chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }
}

#[test]
fn highlight_tints_only_hit_pixels() {
    let page = MockPage::new(100.0, 100.0).text("mark", NativeRect::new(10.0, 10.0, 20.0, 20.0));
    let doc = open(MockPdf::new().page(page));
    let mut rendered = doc.render_page(0, 72.0, 1, "mark").unwrap();
    rendered.highlight_hits(Rgba([255, 255, 0, 96]));

    let image = rendered.into_image();
    let inside = image.get_pixel(15, 15).0;
    assert_eq!(inside[0], 255);
    assert!(inside[2] < 255);
    assert_eq!(image.get_pixel(50, 50).0, [255, 255, 255, 255]);
}

fn assert_no_engine_objects_left(context: &str) {
    let stats = mock_stats();
    assert_eq!(stats.pages_loaded, stats.pages_dropped, "pages leaked: {context}");
    assert_eq!(
        stats.display_lists_created, stats.display_lists_dropped,
        "display lists leaked: {context}"
    );
}

#[test]
fn render_leaves_no_engine_pages_behind() {
    reset_mock_stats();
    let doc = open(MockPdf::new().page(gurps_page()));
    for _ in 0..3 {
        doc.render_page(0, 100.0, 20, "GURPS").unwrap();
    }
    let stats = mock_stats();
    assert_eq!(stats.pages_loaded, 3);
    assert_eq!(stats.display_lists_created, 3);
    assert_no_engine_objects_left("successful renders");

    doc.release();
    let stats = mock_stats();
    assert_eq!(stats.documents_dropped, 1);
    assert_eq!(stats.contexts_dropped, 1);
}

#[test]
fn failed_renders_drop_page_and_display_list() {
    let cases = [
        (FailPoint::DisplayList, ScaleRequest::Dpi(72.0)),
        (FailPoint::Rasterize, ScaleRequest::Dpi(72.0)),
        (FailPoint::TruncatedPixmap, ScaleRequest::Dpi(72.0)),
        (
            FailPoint::Bounds,
            ScaleRequest::Fit {
                max_width: 100.0,
                max_height: 100.0,
            },
        ),
    ];
    for (point, request) in cases {
        reset_mock_stats();
        let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)).fail(point));
        assert!(doc.render(0, request, 0, "").is_err(), "{point:?}");
        assert_eq!(mock_stats().pages_loaded, 1, "{point:?}");
        assert_no_engine_objects_left(&format!("{point:?}"));
    }
}

#[test]
fn page_size_drops_the_page() {
    reset_mock_stats();
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)));
    doc.page_size(0).unwrap();
    let doc = open(MockPdf::new().page(MockPage::new(10.0, 10.0)).fail(FailPoint::Bounds));
    assert!(doc.page_size(0).is_err());
    assert_eq!(mock_stats().pages_loaded, 2);
    assert_no_engine_objects_left("page_size");
}
