//! Print sheet rendering: tile one photo over a [`SheetLayout`].

use crate::error::{invalid, Result};
use crate::layout::{CutGuide, SheetLayout};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Appearance of a rendered sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetStyle {
    pub paper: Rgb<u8>,
    pub draw_guides: bool,
    pub guide_color: Rgb<u8>,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            paper: Rgb([255, 255, 255]),
            draw_guides: true,
            guide_color: Rgb([160, 160, 160]),
        }
    }
}

/// Render every cell of `layout` with a copy of `photo`.
///
/// The photo is resized once to the cell size. Cut guides are drawn on top
/// of the photos. A layout with no cells yields a blank sheet.
pub fn render_sheet(photo: &RgbImage, layout: &SheetLayout, style: &SheetStyle) -> Result<RgbImage> {
    if layout.sheet_width_px == 0 || layout.sheet_height_px == 0 {
        return Err(invalid("sheet has zero pixel size"));
    }
    if photo.width() == 0 || photo.height() == 0 {
        return Err(invalid("photo is empty"));
    }

    let mut sheet = RgbImage::from_pixel(layout.sheet_width_px, layout.sheet_height_px, style.paper);

    let cells = layout.cells();
    if cells.is_empty() {
        tracing::warn!(
            width = layout.sheet_width_px,
            height = layout.sheet_height_px,
            "no photos fit on this sheet"
        );
        return Ok(sheet);
    }

    let tile = if photo.dimensions() == (layout.photo_width_px, layout.photo_height_px) {
        photo.clone()
    } else {
        imageops::resize(photo, layout.photo_width_px, layout.photo_height_px, FilterType::Lanczos3)
    };

    for cell in &cells {
        imageops::replace(&mut sheet, &tile, cell.x as i64, cell.y as i64);
    }

    if style.draw_guides {
        let width = layout.guide_width_px();
        for guide in layout.cut_guides() {
            draw_guide(&mut sheet, &guide, width, style.guide_color);
        }
    }

    tracing::info!(
        photos = cells.len(),
        width = sheet.width(),
        height = sheet.height(),
        "sheet rendered"
    );

    Ok(sheet)
}

/// Draw an axis-aligned guide as a `width`-pixel stroke, clipped to the sheet.
fn draw_guide(sheet: &mut RgbImage, guide: &CutGuide, width: u32, color: Rgb<u8>) {
    let (x0, x1) = (guide.x1.min(guide.x2), guide.x1.max(guide.x2));
    let (y0, y1) = (guide.y1.min(guide.y2), guide.y1.max(guide.y2));
    let (x_end, y_end) = if guide.y1 == guide.y2 {
        (x1, y0 + width)
    } else {
        (x0 + width, y1)
    };
    for y in y0..y_end.min(sheet.height()) {
        for x in x0..x_end.min(sheet.width()) {
            sheet.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_sheet_layout, LayoutOptions};
    use crate::standards::SheetSize;

    fn small_sheet() -> SheetSize {
        // 100 x 60 mm at 25.4 dpi → 1 px per mm
        SheetSize {
            id: "small".into(),
            name: "Small".into(),
            width_mm: 100.0,
            height_mm: 60.0,
            dpi: 254,
        }
    }

    #[test]
    fn test_render_dimensions_and_tiles() {
        let layout =
            compute_sheet_layout(20.0, 25.0, &small_sheet(), &LayoutOptions::default().with_scale(0.1))
                .unwrap();
        // usable 90 x 50: columns = floor(92 / 22) = 4, rows = floor(52 / 27) = 1
        assert_eq!((layout.columns, layout.rows), (4, 1));
        assert_eq!((layout.sheet_width_px, layout.sheet_height_px), (100, 60));

        let photo = RgbImage::from_pixel(40, 50, Rgb([10, 20, 30]));
        let style = SheetStyle { draw_guides: false, ..Default::default() };
        let sheet = render_sheet(&photo, &layout, &style).unwrap();
        assert_eq!(sheet.dimensions(), (100, 60));

        for cell in layout.cells() {
            let center = sheet.get_pixel(cell.x + cell.width / 2, cell.y + cell.height / 2);
            assert_eq!(*center, Rgb([10, 20, 30]));
        }
        // Margin stays paper-white
        assert_eq!(*sheet.get_pixel(1, 1), Rgb([255, 255, 255]));
        // Gap between first two columns stays white
        let first = layout.cell(0, 0).unwrap();
        assert_eq!(*sheet.get_pixel(first.x + first.width, first.y + 3), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_guides_drawn() {
        let layout = compute_sheet_layout(20.0, 25.0, &small_sheet(), &LayoutOptions::default().with_scale(0.1))
            .unwrap();
        let photo = RgbImage::from_pixel(20, 25, Rgb([0, 0, 0]));
        let style = SheetStyle::default();
        let sheet = render_sheet(&photo, &layout, &style).unwrap();
        let cell = layout.cell(0, 1).unwrap();
        assert_eq!(*sheet.get_pixel(cell.x, cell.y), style.guide_color);
        assert_eq!(*sheet.get_pixel(cell.x + 1, cell.y), style.guide_color);
        assert_eq!(*sheet.get_pixel(cell.x, cell.y + 1), style.guide_color);
        assert_eq!(*sheet.get_pixel(cell.x + 5, cell.y + 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_empty_layout_renders_blank() {
        let options = LayoutOptions { margin_mm: 45.0, ..Default::default() }.with_scale(0.1);
        let layout = compute_sheet_layout(20.0, 25.0, &small_sheet(), &options).unwrap();
        assert_eq!(layout.total_photos, 0);
        let photo = RgbImage::from_pixel(20, 25, Rgb([0, 0, 0]));
        let sheet = render_sheet(&photo, &layout, &SheetStyle::default()).unwrap();
        assert!(sheet.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }
}
