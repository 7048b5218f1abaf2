//! Auto-alignment: scale and position a face on a standard-sized canvas.
//!
//! The solver sizes the face to the middle of the standard's head-height band,
//! centers it horizontally, and puts the estimated eye line at the standard's
//! eye-line height. The renderer applies the resulting [`Transform`] to an
//! RGB image with bilinear sampling.

use crate::compliance::eye_line_y;
use crate::error::{invalid, PhotoError, Result};
use crate::standards::Standard;
use crate::types::{FaceBox, Transform};
use image::{Rgb, RgbImage};

/// Target head height as a fraction of canvas height: the midpoint of the standard's band.
pub fn target_head_height(standard: &Standard) -> f64 {
    (standard.head_height_min + standard.head_height_max) / 2.0 / 100.0
}

/// Compute the transform that places `face` (in an `image`-sized source) onto
/// a `canvas`-sized photo so that it satisfies `standard`.
///
/// Offsets are relative to the natural centered placement of the scaled image.
/// The face box is clamped to the image first. A non-positive face height is
/// `DegenerateGeometry`; any other malformed box is `InvalidArgument`.
pub fn solve_alignment(
    face: &FaceBox,
    image: (u32, u32),
    canvas: (u32, u32),
    standard: &Standard,
) -> Result<Transform> {
    if image.0 == 0 || image.1 == 0 {
        return Err(invalid(format!("image dimensions must be positive, got {}x{}", image.0, image.1)));
    }
    if canvas.0 == 0 || canvas.1 == 0 {
        return Err(invalid(format!(
            "canvas dimensions must be positive, got {}x{}",
            canvas.0, canvas.1
        )));
    }
    let face_height = face.height();
    if !face_height.is_finite() || face_height <= 0.0 {
        return Err(PhotoError::DegenerateGeometry(format!(
            "face height must be positive, got {face_height}"
        )));
    }
    // Inverted x, bad score or a box off the image is a malformed argument.
    let face = &FaceBox::new(face.xmin, face.ymin, face.xmax, face.ymax, face.score)?
        .clamped(image.0, image.1)?;
    let face_height = face.height();

    let (image_w, image_h) = (image.0 as f64, image.1 as f64);
    let (canvas_w, canvas_h) = (canvas.0 as f64, canvas.1 as f64);

    let scale = canvas_h * target_head_height(standard) / face_height;

    // Natural placement centers the scaled image on the canvas.
    let natural_x = (canvas_w - image_w * scale) / 2.0;
    let natural_y = (canvas_h - image_h * scale) / 2.0;

    let target_center_x = canvas_w / 2.0;
    let target_eye_y = canvas_h * (1.0 - standard.eye_line_from_bottom / 100.0);

    let translate_x = target_center_x - (natural_x + face.center_x() * scale);
    let translate_y = target_eye_y - (natural_y + eye_line_y(face) * scale);

    tracing::debug!(scale, translate_x, translate_y, standard = %standard.id, "alignment solved");

    Ok(Transform { scale, translate_x, translate_y })
}

/// Draw `image` onto a new `canvas`-sized RGB image through `transform`.
///
/// Each canvas pixel is mapped back into source space and sampled
/// bilinearly. Pixels that fall outside the source take `fill`.
pub fn render_aligned(
    image: &RgbImage,
    transform: &Transform,
    canvas: (u32, u32),
    fill: Rgb<u8>,
) -> Result<RgbImage> {
    if canvas.0 == 0 || canvas.1 == 0 {
        return Err(invalid(format!(
            "canvas dimensions must be positive, got {}x{}",
            canvas.0, canvas.1
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(invalid("source image is empty"));
    }
    if !(transform.scale.is_finite() && transform.scale > 0.0) {
        return Err(PhotoError::DegenerateGeometry(format!(
            "transform scale must be positive, got {}",
            transform.scale
        )));
    }

    let dims = image.dimensions();
    let (src_w, src_h) = (dims.0 as i64, dims.1 as i64);
    let mut output = RgbImage::from_pixel(canvas.0, canvas.1, fill);

    for (ox, oy, px) in output.enumerate_pixels_mut() {
        // Sample at pixel centers
        let (sx, sy) = transform.invert((ox as f64 + 0.5, oy as f64 + 0.5), dims, canvas);
        let (sx, sy) = (sx - 0.5, sy - 0.5);

        if sx < -0.5 || sy < -0.5 || sx > src_w as f64 - 0.5 || sy > src_h as f64 - 0.5 {
            continue;
        }

        let x0 = sx.floor() as i64;
        let y0 = sy.floor() as i64;
        let fx = sx - x0 as f64;
        let fy = sy - y0 as f64;

        let sample = |x: i64, y: i64| -> [f64; 3] {
            let x = x.clamp(0, src_w - 1) as u32;
            let y = y.clamp(0, src_h - 1) as u32;
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            [r as f64, g as f64, b as f64]
        };

        let tl = sample(x0, y0);
        let tr = sample(x0 + 1, y0);
        let bl = sample(x0, y0 + 1);
        let br = sample(x0 + 1, y0 + 1);

        let mut out = [0u8; 3];
        for c in 0..3 {
            let val = tl[c] * (1.0 - fx) * (1.0 - fy)
                + tr[c] * fx * (1.0 - fy)
                + bl[c] * (1.0 - fx) * fy
                + br[c] * fx * fy;
            out[c] = val.round().clamp(0.0, 255.0) as u8;
        }
        *px = Rgb(out);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standards::lookup_standard;

    fn us() -> &'static Standard {
        lookup_standard("us").unwrap()
    }

    #[test]
    fn test_scale_matches_band_midpoint() {
        let face = FaceBox::new(100.0, 100.0, 180.0, 200.0, 0.9).unwrap();
        let t = solve_alignment(&face, (400, 400), (400, 400), us()).unwrap();
        assert!((target_head_height(us()) - 0.595).abs() < 1e-12);
        assert!((t.scale - 2.38).abs() < 1e-9, "scale = {}", t.scale);
    }

    #[test]
    fn test_face_lands_on_targets() {
        let face = FaceBox::new(220.0, 150.0, 380.0, 350.0, 0.9).unwrap();
        let image = (640, 480);
        let canvas = (600, 600);
        let std = us();
        let t = solve_alignment(&face, image, canvas, std).unwrap();

        let (cx, _) = t.apply((face.center_x(), 0.0), image, canvas);
        assert!((cx - 300.0).abs() < 1e-9, "center x = {cx}");

        let (_, ey) = t.apply((0.0, eye_line_y(&face)), image, canvas);
        let expected_eye = 600.0 * (1.0 - std.eye_line_from_bottom / 100.0);
        assert!((ey - expected_eye).abs() < 1e-9, "eye y = {ey}");

        // Scaled head occupies the band midpoint
        let (_, top) = t.apply((0.0, face.ymin), image, canvas);
        let (_, bottom) = t.apply((0.0, face.ymax), image, canvas);
        assert!(((bottom - top) / 600.0 - 0.595).abs() < 1e-9);
    }

    #[test]
    fn test_already_aligned_face_needs_no_offset() {
        // Canvas == image; face already sized and positioned for the US standard.
        let std = us();
        let canvas = 1000u32;
        let face_h = 1000.0 * target_head_height(std);
        let eye_y = 1000.0 * (1.0 - std.eye_line_from_bottom / 100.0);
        let ymin = eye_y - face_h * 0.35;
        let face = FaceBox::new(400.0, ymin, 600.0, ymin + face_h, 0.9).unwrap();
        let t = solve_alignment(&face, (canvas, canvas), (canvas, canvas), std).unwrap();
        assert!((t.scale - 1.0).abs() < 1e-9);
        assert!(t.translate_x.abs() < 1e-9);
        assert!(t.translate_y.abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_face_height() {
        let flat = FaceBox { xmin: 10.0, ymin: 50.0, xmax: 20.0, ymax: 50.0, score: 0.9 };
        let err = solve_alignment(&flat, (100, 100), (100, 100), us()).unwrap_err();
        assert!(matches!(err, PhotoError::DegenerateGeometry(_)));

        let inverted = FaceBox { xmin: 10.0, ymin: 60.0, xmax: 20.0, ymax: 50.0, score: 0.9 };
        assert!(matches!(
            solve_alignment(&inverted, (100, 100), (100, 100), us()),
            Err(PhotoError::DegenerateGeometry(_))
        ));

        let nan = FaceBox { xmin: 10.0, ymin: f64::NAN, xmax: 20.0, ymax: 50.0, score: 0.9 };
        assert!(matches!(
            solve_alignment(&nan, (100, 100), (100, 100), us()),
            Err(PhotoError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_malformed_face_box_rejected() {
        let x_inverted = FaceBox { xmin: 300.0, ymin: 100.0, xmax: 100.0, ymax: 200.0, score: 0.9 };
        assert!(matches!(
            solve_alignment(&x_inverted, (400, 400), (400, 400), us()),
            Err(PhotoError::InvalidArgument(_))
        ));

        let bad_score = FaceBox { xmin: 100.0, ymin: 100.0, xmax: 200.0, ymax: 200.0, score: 7.0 };
        assert!(matches!(
            solve_alignment(&bad_score, (400, 400), (400, 400), us()),
            Err(PhotoError::InvalidArgument(_))
        ));

        let off_image = FaceBox { xmin: -5000.0, ymin: 100.0, xmax: -4000.0, ymax: 200.0, score: 0.9 };
        assert!(matches!(
            solve_alignment(&off_image, (400, 400), (400, 400), us()),
            Err(PhotoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_face_box_clamped_before_solving() {
        // Box spills past the right edge; the solver works on the visible part.
        let spill = FaceBox::new(300.0, 100.0, 500.0, 200.0, 0.9).unwrap();
        let visible = FaceBox::new(300.0, 100.0, 400.0, 200.0, 0.9).unwrap();
        let a = solve_alignment(&spill, (400, 400), (400, 400), us()).unwrap();
        let b = solve_alignment(&visible, (400, 400), (400, 400), us()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let face = FaceBox::new(10.0, 10.0, 20.0, 20.0, 0.9).unwrap();
        assert!(matches!(
            solve_alignment(&face, (100, 100), (0, 100), us()),
            Err(PhotoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_render_identity_copies_source() {
        let mut img = RgbImage::new(8, 6);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x * 30) as u8, (y * 40) as u8, 7]);
        }
        let out = render_aligned(&img, &Transform::IDENTITY, (8, 6), Rgb([255, 0, 255])).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_render_fills_outside_source() {
        let img = RgbImage::from_pixel(10, 10, Rgb([50, 60, 70]));
        let t = Transform { scale: 1.0, translate_x: 0.0, translate_y: 0.0 };
        let out = render_aligned(&img, &t, (30, 10), Rgb([255, 255, 255])).unwrap();
        assert_eq!(out.dimensions(), (30, 10));
        // Image is centered horizontally: columns 10..20 hold the source
        assert_eq!(*out.get_pixel(2, 5), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(15, 5), Rgb([50, 60, 70]));
        assert_eq!(*out.get_pixel(27, 5), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_render_upscale_uniform() {
        let img = RgbImage::from_pixel(4, 4, Rgb([90, 90, 90]));
        let t = Transform { scale: 3.0, translate_x: 0.0, translate_y: 0.0 };
        let out = render_aligned(&img, &t, (12, 12), Rgb([0, 0, 0])).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([90, 90, 90])));
    }
}
