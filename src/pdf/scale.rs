//! Scale derivation from DPI or fit-to-box requests
//!
//! Engine page space is 72 units per inch. A scale is the dimensionless
//! multiplier from that space into caller pixels.

use super::error::{Error, Result};

/// Native engine resolution
pub const NATIVE_DPI: f32 = 72.0;

/// Ceiling for DPI-derived scales. Displays that misreport their DPI would
/// otherwise ask for enormous rasters.
pub const MAX_DPI_SCALE: f32 = 10.0;

/// How the caller wants a page sized
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleRequest {
    /// Render at a fixed resolution
    Dpi(f32),
    /// Render as large as possible inside a box, preserving aspect ratio
    Fit { max_width: f32, max_height: f32 },
}

/// `dpi / 72`, saturating at [`MAX_DPI_SCALE`].
///
/// The input is not checked; callers that take a DPI from outside go
/// through [`checked_scale_from_dpi`].
#[must_use]
pub fn scale_from_dpi(dpi: f32) -> f32 {
    (dpi / NATIVE_DPI).min(MAX_DPI_SCALE)
}

/// [`scale_from_dpi`] for a finite, positive `dpi`, else
/// [`Error::InvalidDpi`]
pub fn checked_scale_from_dpi(dpi: f32) -> Result<f32> {
    if !(dpi > 0.0 && dpi.is_finite()) {
        return Err(Error::InvalidDpi { dpi });
    }
    Ok(scale_from_dpi(dpi))
}

/// Largest scale at which a `page_width` x `page_height` page fits inside
/// `max_width` x `max_height`.
pub fn scale_from_fit(
    page_width: f32,
    page_height: f32,
    max_width: f32,
    max_height: f32,
) -> Result<f32> {
    let invalid = || Error::InvalidPageSize {
        width: page_width,
        height: page_height,
    };

    if !(page_width > 0.0 && page_height > 0.0) {
        return Err(invalid());
    }
    // f32::min skips a NaN operand, so reject NaN bounds up front
    if max_width.is_nan() || max_height.is_nan() {
        return Err(invalid());
    }

    let scale = (max_width / page_width).min(max_height / page_height);
    if scale > 0.0 && scale.is_finite() {
        Ok(scale)
    } else {
        Err(invalid())
    }
}
