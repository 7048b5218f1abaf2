//! Millimeter ↔ pixel conversion at a given print resolution.

use crate::error::{invalid, Result};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert a physical length to whole pixels at `dpi`.
///
/// Rounds to the nearest pixel, so the conversion is lossy: converting back with
/// [`px_to_mm`] lands within `25.4 / dpi` mm of the input.
pub fn mm_to_px(mm: f64, dpi: u32) -> Result<u32> {
    if dpi == 0 {
        return Err(invalid("dpi must be greater than zero"));
    }
    if !mm.is_finite() || mm < 0.0 {
        return Err(invalid(format!("length must be a finite, non-negative mm value, got {mm}")));
    }
    Ok((mm / MM_PER_INCH * dpi as f64).round() as u32)
}

/// Convert a pixel count back to millimeters at `dpi`.
pub fn px_to_mm(px: u32, dpi: u32) -> Result<f64> {
    if dpi == 0 {
        return Err(invalid("dpi must be greater than zero"));
    }
    Ok(px as f64 * MM_PER_INCH / dpi as f64)
}
