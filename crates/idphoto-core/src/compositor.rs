//! Background replacement from a soft foreground mask.
//!
//! Segmentation models emit masks at their own internal resolution, so the
//! mask is resampled to the source size before it becomes the alpha channel.
//! Output color is the straight alpha blend of source over a solid background.

use crate::error::{invalid, PhotoError, Result};
use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Segment labels treated as the photo subject, in order of preference.
pub const SUBJECT_LABELS: [&str; 2] = ["person", "foreground"];

/// Masks whose peak opacity is below this are treated as empty.
pub const MIN_SUBJECT_OPACITY: f32 = 1.0 / 255.0;

/// Mask upscaling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    #[default]
    Bilinear,
}

/// Per-pixel foreground opacity in [0, 1], row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    /// Wrap raw mask data. NaN values read as 0, others are clamped to [0, 1].
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("mask dimensions must be positive, got {width}x{height}")));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(invalid(format!(
                "mask data length {} does not match {width}x{height}",
                data.len()
            )));
        }
        let data = data
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
            .collect();
        Ok(Self { width, height, data })
    }

    /// Read a mask from an 8-bit grayscale image (0 = background, 255 = subject).
    pub fn from_luma(img: &GrayImage) -> Result<Self> {
        let data = img.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::new(img.width(), img.height(), data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn at(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Highest opacity anywhere in the mask.
    pub fn peak(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Resample to `width` x `height` and quantize to 8-bit alpha.
    pub fn resample(&self, width: u32, height: u32, mode: Resampling) -> Result<GrayImage> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("target dimensions must be positive, got {width}x{height}")));
        }
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        let max_x = self.width - 1;
        let max_y = self.height - 1;

        let alpha = GrayImage::from_fn(width, height, |x, y| {
            let v = match mode {
                Resampling::Nearest => {
                    let mx = (((x as f32 + 0.5) * sx) as u32).min(max_x);
                    let my = (((y as f32 + 0.5) * sy) as u32).min(max_y);
                    self.at(mx, my)
                }
                Resampling::Bilinear => {
                    let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x as f32);
                    let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y as f32);
                    let x0 = fx.floor() as u32;
                    let y0 = fy.floor() as u32;
                    let x1 = (x0 + 1).min(max_x);
                    let y1 = (y0 + 1).min(max_y);
                    let dx = fx - x0 as f32;
                    let dy = fy - y0 as f32;
                    let top = self.at(x0, y0) * (1.0 - dx) + self.at(x1, y0) * dx;
                    let bottom = self.at(x0, y1) * (1.0 - dx) + self.at(x1, y1) * dx;
                    top * (1.0 - dy) + bottom * dy
                }
            };
            image::Luma([to_alpha(v)])
        });
        Ok(alpha)
    }
}

fn to_alpha(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// One segmentation model output entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub score: f32,
    pub mask: Mask,
}

/// Pick the subject mask from a segmenter's output.
///
/// Subject-labelled segments win over others, higher score first. Segments
/// whose mask is empty are ignored. Nothing usable is `NoSubjectDetected`.
pub fn select_subject_mask(segments: &[Segment]) -> Result<&Mask> {
    let usable = |s: &&Segment| s.mask.peak() >= MIN_SUBJECT_OPACITY;
    let by_score = |a: &&Segment, b: &&Segment| {
        a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal)
    };

    for label in SUBJECT_LABELS {
        if let Some(segment) = segments
            .iter()
            .filter(|s| s.label.eq_ignore_ascii_case(label))
            .filter(usable)
            .max_by(by_score)
        {
            return Ok(&segment.mask);
        }
    }

    segments
        .iter()
        .filter(usable)
        .max_by(by_score)
        .map(|s| &s.mask)
        .ok_or(PhotoError::NoSubjectDetected)
}

/// Attach the resampled mask to `source` as its alpha channel.
pub fn cutout(source: &RgbImage, mask: &Mask, mode: Resampling) -> Result<RgbaImage> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 {
        return Err(invalid("source image is empty"));
    }
    let alpha = mask.resample(w, h, mode)?;
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        let Rgb([r, g, b]) = *source.get_pixel(x, y);
        Rgba([r, g, b, alpha.get_pixel(x, y).0[0]])
    }))
}

/// Straight-alpha blend of `src` over `background` for one channel.
fn blend(src: u8, background: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + background as u32 * (255 - a) + 127) / 255) as u8
}

/// Flatten an RGBA image onto a solid background.
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let Rgb([br, bg, bb]) = background;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        Rgb([blend(r, br, a), blend(g, bg, a), blend(b, bb, a)])
    })
}

/// Replace everything outside the subject mask with `background`.
pub fn replace_background(
    source: &RgbImage,
    mask: &Mask,
    background: Rgb<u8>,
    mode: Resampling,
) -> Result<RgbImage> {
    let composited = flatten(&cutout(source, mask, mode)?, background);
    tracing::debug!(
        width = composited.width(),
        height = composited.height(),
        mask_width = mask.width(),
        mask_height = mask.height(),
        ?mode,
        "background replaced"
    );
    Ok(composited)
}
