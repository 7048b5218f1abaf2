//! Multi-up sheet layout.
//!
//! Computes how many copies of one photo fit on a print sheet and where each
//! copy goes, in sheet pixels. Grid topology is decided in millimeters, so a
//! preview layout (scale < 1) and the export layout (scale = 1) always have
//! the same rows and columns; only the pixel magnitudes differ.

use crate::error::{invalid, Result};
use crate::standards::{SheetSize, Standard};
use crate::units::mm_to_px;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Default blank border around the sheet (mm).
pub const DEFAULT_MARGIN_MM: f64 = 5.0;

/// Default space between adjacent photos (mm).
pub const DEFAULT_GAP_MM: f64 = 2.0;

/// Length of each cut-guide tick at scale 1 (pixels). Independent of DPI.
pub const CUT_GUIDE_LENGTH_PX: f64 = 20.0;

/// Stroke width of cut guides at scale 1 (pixels).
pub const CUT_GUIDE_WIDTH_PX: f64 = 1.0;

/// Upper bound on copies per sheet; larger grids are rejected.
pub const MAX_PHOTOS_PER_SHEET: u32 = 10_000;

// =============================================================================
// Types
// =============================================================================

/// Margin, gap and resolution scale for a sheet layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub margin_mm: f64,
    pub gap_mm: f64,
    /// Multiplier applied after mm → px conversion: 1.0 for export, < 1.0 for previews.
    pub scale: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            margin_mm: DEFAULT_MARGIN_MM,
            gap_mm: DEFAULT_GAP_MM,
            scale: 1.0,
        }
    }
}

impl LayoutOptions {
    /// Same margins, at a different resolution scale.
    pub fn with_scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    fn validate(&self) -> Result<()> {
        if !(self.margin_mm.is_finite() && self.margin_mm >= 0.0) {
            return Err(invalid(format!("margin must be non-negative, got {} mm", self.margin_mm)));
        }
        if !(self.gap_mm.is_finite() && self.gap_mm >= 0.0) {
            return Err(invalid(format!("gap must be non-negative, got {} mm", self.gap_mm)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid(format!("scale must be positive, got {}", self.scale)));
        }
        Ok(())
    }
}

/// Grid of photo copies on a sheet, in sheet pixels at `scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub columns: u32,
    pub rows: u32,
    pub total_photos: u32,
    pub margin_px: u32,
    pub gap_px: u32,
    pub photo_width_px: u32,
    pub photo_height_px: u32,
    pub sheet_width_px: u32,
    pub sheet_height_px: u32,
    pub dpi: u32,
    pub scale: f64,
}

/// Position of one photo copy on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPlacement {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A straight cut-guide segment in sheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutGuide {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

// =============================================================================
// Layout Calculation
// =============================================================================

/// Number of `item`-sized items with `gap` between them that fit in `span`.
///
/// The `+ gap` in the numerator accounts for the last item not needing a
/// trailing gap. Negative space yields zero.
fn fit_count(span: f64, item: f64, gap: f64) -> u32 {
    let n = ((span + gap) / (item + gap)).floor();
    if n.is_finite() && n > 0.0 {
        n as u32
    } else {
        0
    }
}

fn scaled_px(mm: f64, dpi: u32, scale: f64) -> Result<u32> {
    Ok((mm_to_px(mm, dpi)? as f64 * scale).round() as u32)
}

/// Lay out copies of a `photo_width_mm` x `photo_height_mm` photo on `sheet`.
pub fn compute_sheet_layout(
    photo_width_mm: f64,
    photo_height_mm: f64,
    sheet: &SheetSize,
    options: &LayoutOptions,
) -> Result<SheetLayout> {
    if !(photo_width_mm.is_finite() && photo_width_mm > 0.0)
        || !(photo_height_mm.is_finite() && photo_height_mm > 0.0)
    {
        return Err(invalid(format!(
            "photo size must be positive, got {photo_width_mm}x{photo_height_mm} mm"
        )));
    }
    sheet.validate()?;
    options.validate()?;

    let usable_width = sheet.width_mm - 2.0 * options.margin_mm;
    let usable_height = sheet.height_mm - 2.0 * options.margin_mm;

    let columns = fit_count(usable_width, photo_width_mm, options.gap_mm);
    let rows = fit_count(usable_height, photo_height_mm, options.gap_mm);

    let total_photos = columns
        .checked_mul(rows)
        .filter(|&n| n <= MAX_PHOTOS_PER_SHEET)
        .ok_or_else(|| {
            invalid(format!(
                "{photo_width_mm}x{photo_height_mm} mm photos give a {columns}x{rows} grid, \
                 more than {MAX_PHOTOS_PER_SHEET} per sheet"
            ))
        })?;

    let dpi = sheet.dpi;
    let scale = options.scale;
    let photo_width_px = scaled_px(photo_width_mm, dpi, scale)?;
    let photo_height_px = scaled_px(photo_height_mm, dpi, scale)?;
    if total_photos > 0 && (photo_width_px == 0 || photo_height_px == 0) {
        return Err(invalid(format!(
            "photo of {photo_width_mm}x{photo_height_mm} mm is under one pixel at {dpi} dpi, scale {scale}"
        )));
    }

    let layout = SheetLayout {
        columns,
        rows,
        total_photos,
        margin_px: scaled_px(options.margin_mm, dpi, scale)?,
        gap_px: scaled_px(options.gap_mm, dpi, scale)?,
        photo_width_px,
        photo_height_px,
        sheet_width_px: scaled_px(sheet.width_mm, dpi, scale)?,
        sheet_height_px: scaled_px(sheet.height_mm, dpi, scale)?,
        dpi,
        scale,
    };

    tracing::debug!(
        sheet = %sheet.id,
        columns,
        rows,
        scale,
        width_px = layout.sheet_width_px,
        height_px = layout.sheet_height_px,
        "sheet layout computed"
    );

    Ok(layout)
}

/// Lay out copies of a `standard`-sized photo on `sheet`.
pub fn layout_for_standard(
    standard: &Standard,
    sheet: &SheetSize,
    options: &LayoutOptions,
) -> Result<SheetLayout> {
    compute_sheet_layout(standard.width_mm, standard.height_mm, sheet, options)
}

impl SheetLayout {
    /// Placement of the cell at `row`, `col`, if it is part of the grid.
    pub fn cell(&self, row: u32, col: u32) -> Option<CellPlacement> {
        if row >= self.rows || col >= self.columns {
            return None;
        }
        Some(CellPlacement {
            row,
            col,
            x: self.margin_px + col * (self.photo_width_px + self.gap_px),
            y: self.margin_px + row * (self.photo_height_px + self.gap_px),
            width: self.photo_width_px,
            height: self.photo_height_px,
        })
    }

    /// All cells, row by row.
    pub fn cells(&self) -> Vec<CellPlacement> {
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |col| (row, col)))
            .filter_map(|(row, col)| self.cell(row, col))
            .collect()
    }

    /// Tick length for cut guides at this layout's scale, capped to the photo size.
    pub fn guide_length_px(&self) -> u32 {
        let len = (CUT_GUIDE_LENGTH_PX * self.scale).round().max(1.0) as u32;
        len.min(self.photo_width_px).min(self.photo_height_px)
    }

    /// Stroke width for cut guides at this layout's scale (at least one pixel).
    pub fn guide_width_px(&self) -> u32 {
        (CUT_GUIDE_WIDTH_PX * self.scale).round().max(1.0) as u32
    }

    /// Corner ticks at each cell's top-left corner, one along the top edge
    /// and one along the left edge.
    pub fn cut_guides(&self) -> Vec<CutGuide> {
        let len = self.guide_length_px();
        if len == 0 {
            return Vec::new();
        }
        let mut guides = Vec::with_capacity(self.total_photos as usize * 2);
        for cell in self.cells() {
            guides.push(CutGuide { x1: cell.x, y1: cell.y, x2: cell.x + len, y2: cell.y });
            guides.push(CutGuide { x1: cell.x, y1: cell.y, x2: cell.x, y2: cell.y + len });
        }
        guides
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhotoError;
    use crate::standards::{lookup_sheet, lookup_standard};

    fn sheet(width_mm: f64, height_mm: f64, dpi: u32) -> SheetSize {
        SheetSize {
            id: "test".into(),
            name: "Test".into(),
            width_mm,
            height_mm,
            dpi,
        }
    }

    #[test]
    fn test_a4_35x45() {
        let layout =
            compute_sheet_layout(35.0, 45.0, &sheet(210.0, 297.0, 300), &LayoutOptions::default())
                .unwrap();
        assert_eq!(layout.columns, 5);
        assert_eq!(layout.rows, 6);
        assert_eq!(layout.total_photos, 30);
        assert_eq!(layout.margin_px, 59);
        assert_eq!(layout.gap_px, 24);
        assert_eq!(layout.photo_width_px, 413);
        assert_eq!(layout.photo_height_px, 531);
        assert_eq!(layout.sheet_width_px, 2480);
        assert_eq!(layout.sheet_height_px, 3508);
    }

    #[test]
    fn test_margin_too_large_gives_zero() {
        let options = LayoutOptions { margin_mm: 90.0, ..Default::default() };
        let layout = compute_sheet_layout(35.0, 45.0, &sheet(210.0, 297.0, 300), &options).unwrap();
        assert_eq!(layout.columns, 0);
        assert_eq!(layout.total_photos, 0);
        assert!(layout.cells().is_empty());
        assert!(layout.cut_guides().is_empty());

        // Usable space negative on both axes
        let options = LayoutOptions { margin_mm: 500.0, ..Default::default() };
        let layout = compute_sheet_layout(35.0, 45.0, &sheet(210.0, 297.0, 300), &options).unwrap();
        assert_eq!((layout.columns, layout.rows, layout.total_photos), (0, 0, 0));
    }

    #[test]
    fn test_exact_fit_without_trailing_gap() {
        // 3 photos of 30mm + 2 gaps of 5mm = 100mm exactly
        let options = LayoutOptions { margin_mm: 0.0, gap_mm: 5.0, scale: 1.0 };
        let layout = compute_sheet_layout(30.0, 30.0, &sheet(100.0, 100.0, 254), &options).unwrap();
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.rows, 3);
    }

    #[test]
    fn test_preview_shares_topology() {
        let uk = lookup_standard("uk").unwrap();
        let sheet = lookup_sheet("4x6").unwrap();
        let export = layout_for_standard(uk, sheet, &LayoutOptions::default()).unwrap();
        let preview =
            layout_for_standard(uk, sheet, &LayoutOptions::default().with_scale(0.5)).unwrap();
        assert_eq!(export.columns, preview.columns);
        assert_eq!(export.rows, preview.rows);
        assert_eq!(export.total_photos, preview.total_photos);
        assert_eq!(preview.photo_width_px, (export.photo_width_px as f64 * 0.5).round() as u32);
        assert_eq!(preview.sheet_width_px, (export.sheet_width_px as f64 * 0.5).round() as u32);
        assert_eq!(preview.guide_length_px(), 10);
        assert_eq!(export.guide_length_px(), 20);
    }

    #[test]
    fn test_cell_positions() {
        let layout =
            compute_sheet_layout(35.0, 45.0, &sheet(210.0, 297.0, 300), &LayoutOptions::default())
                .unwrap();
        let cells = layout.cells();
        assert_eq!(cells.len(), 30);
        assert_eq!((cells[0].x, cells[0].y), (59, 59));
        let c = layout.cell(2, 3).unwrap();
        assert_eq!(c.x, 59 + 3 * (413 + 24));
        assert_eq!(c.y, 59 + 2 * (531 + 24));
        assert!(layout.cell(6, 0).is_none());
        assert!(layout.cell(0, 5).is_none());
        // Row-major ordering
        assert_eq!((cells[5].row, cells[5].col), (1, 0));
    }

    #[test]
    fn test_cut_guides_at_top_left_corners() {
        let layout =
            compute_sheet_layout(35.0, 45.0, &sheet(101.6, 152.4, 300), &LayoutOptions::default())
                .unwrap();
        let guides = layout.cut_guides();
        assert_eq!(guides.len(), layout.total_photos as usize * 2);
        let first = layout.cell(0, 0).unwrap();
        assert_eq!(guides[0], CutGuide { x1: first.x, y1: first.y, x2: first.x + 20, y2: first.y });
        assert_eq!(guides[1], CutGuide { x1: first.x, y1: first.y, x2: first.x, y2: first.y + 20 });
    }

    #[test]
    fn test_tiny_photo_rejected_without_overflow() {
        let a4 = sheet(210.0, 297.0, 300);
        let tight = LayoutOptions { margin_mm: 0.0, gap_mm: 0.0, scale: 1.0 };
        // 210000 x 297000 cells would overflow u32
        assert!(matches!(
            compute_sheet_layout(0.001, 0.001, &a4, &tight),
            Err(PhotoError::InvalidArgument(_))
        ));
        // Fits in u32 but far beyond any printable grid
        assert!(matches!(
            compute_sheet_layout(1.0, 1.0, &a4, &tight),
            Err(PhotoError::InvalidArgument(_))
        ));
        // Sub-pixel preview of a photo that otherwise fits
        let tiny_preview = LayoutOptions::default().with_scale(0.001);
        assert!(compute_sheet_layout(35.0, 45.0, &a4, &tiny_preview).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        let a4 = sheet(210.0, 297.0, 300);
        assert!(compute_sheet_layout(0.0, 45.0, &a4, &LayoutOptions::default()).is_err());
        assert!(compute_sheet_layout(35.0, -1.0, &a4, &LayoutOptions::default()).is_err());
        let neg_gap = LayoutOptions { gap_mm: -2.0, ..Default::default() };
        assert!(compute_sheet_layout(35.0, 45.0, &a4, &neg_gap).is_err());
        let zero_scale = LayoutOptions::default().with_scale(0.0);
        assert!(compute_sheet_layout(35.0, 45.0, &a4, &zero_scale).is_err());
        assert!(compute_sheet_layout(35.0, 45.0, &sheet(210.0, 297.0, 0), &LayoutOptions::default()).is_err());
    }
}
