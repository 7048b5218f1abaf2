use crate::error::{invalid, Result};
use serde::{Deserialize, Serialize};

/// Fraction of a person box's width trimmed from each side to estimate the face.
pub const PERSON_FACE_TRIM_X: f64 = 0.20;

/// Fraction of a person box's height (from the top) kept as the face region.
pub const PERSON_FACE_KEEP_TOP: f64 = 0.40;

/// Face bounding box in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    /// Detection confidence in [0, 1].
    pub score: f64,
}

impl FaceBox {
    /// Build a box, rejecting non-finite or inverted coordinates.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, score: f64) -> Result<Self> {
        let face = Self { xmin, ymin, xmax, ymax, score };
        face.check()?;
        Ok(face)
    }

    fn check(&self) -> Result<()> {
        let coords = [self.xmin, self.ymin, self.xmax, self.ymax];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(invalid(format!("face box has non-finite coordinates: {coords:?}")));
        }
        if self.xmin >= self.xmax || self.ymin >= self.ymax {
            return Err(invalid(format!(
                "face box must satisfy xmin < xmax and ymin < ymax, got ({}, {}) - ({}, {})",
                self.xmin, self.ymin, self.xmax, self.ymax
            )));
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(invalid(format!("face box score must lie in [0, 1], got {}", self.score)));
        }
        Ok(())
    }

    /// Clamp the box to `[0, width] x [0, height]`.
    ///
    /// Fails when the box is malformed or lies entirely outside the image.
    pub fn clamped(&self, width: u32, height: u32) -> Result<Self> {
        self.check()?;
        if width == 0 || height == 0 {
            return Err(invalid(format!("image dimensions must be positive, got {width}x{height}")));
        }
        let (w, h) = (width as f64, height as f64);
        let clamped = Self {
            xmin: self.xmin.clamp(0.0, w),
            ymin: self.ymin.clamp(0.0, h),
            xmax: self.xmax.clamp(0.0, w),
            ymax: self.ymax.clamp(0.0, h),
            score: self.score,
        };
        if clamped.xmin >= clamped.xmax || clamped.ymin >= clamped.ymax {
            return Err(invalid("face box lies outside the image"));
        }
        Ok(clamped)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center_x(&self) -> f64 {
        (self.xmin + self.xmax) / 2.0
    }

    /// Estimate the face region from a whole-person box: trim 20% from
    /// each side and keep the top 40% of the height.
    pub fn from_person(person: &FaceBox) -> Result<Self> {
        person.check()?;
        let w = person.width();
        let h = person.height();
        Self::new(
            person.xmin + w * PERSON_FACE_TRIM_X,
            person.ymin,
            person.xmax - w * PERSON_FACE_TRIM_X,
            person.ymin + h * PERSON_FACE_KEEP_TOP,
            person.score,
        )
    }
}

/// Scale-plus-translation applied to the source image before drawing it on a canvas.
///
/// The translation is an offset from the image's natural centered position:
/// a source point `(x, y)` lands on the canvas at
/// `((canvas_w - image_w * scale) / 2 + x * scale + translate_x, ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { scale: 1.0, translate_x: 0.0, translate_y: 0.0 };

    /// Top-left corner of the scaled image on the canvas.
    pub fn origin(&self, image: (u32, u32), canvas: (u32, u32)) -> (f64, f64) {
        (
            (canvas.0 as f64 - image.0 as f64 * self.scale) / 2.0 + self.translate_x,
            (canvas.1 as f64 - image.1 as f64 * self.scale) / 2.0 + self.translate_y,
        )
    }

    /// Map a source pixel coordinate to canvas space.
    pub fn apply(&self, point: (f64, f64), image: (u32, u32), canvas: (u32, u32)) -> (f64, f64) {
        let (ox, oy) = self.origin(image, canvas);
        (ox + point.0 * self.scale, oy + point.1 * self.scale)
    }

    /// Map a canvas coordinate back to source space.
    pub fn invert(&self, point: (f64, f64), image: (u32, u32), canvas: (u32, u32)) -> (f64, f64) {
        let (ox, oy) = self.origin(image, canvas);
        ((point.0 - ox) / self.scale, (point.1 - oy) / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhotoError;

    #[test]
    fn test_face_box_rejects_inverted() {
        assert!(matches!(
            FaceBox::new(10.0, 10.0, 5.0, 20.0, 0.9),
            Err(PhotoError::InvalidArgument(_))
        ));
        assert!(FaceBox::new(10.0, 10.0, 20.0, 10.0, 0.9).is_err());
        assert!(FaceBox::new(0.0, f64::NAN, 20.0, 10.0, 0.9).is_err());
        assert!(FaceBox::new(0.0, 0.0, 20.0, 10.0, 1.5).is_err());
    }

    #[test]
    fn test_clamped_to_image() {
        let face = FaceBox { xmin: -20.0, ymin: -5.0, xmax: 120.0, ymax: 80.0, score: 0.8 };
        let c = face.clamped(100, 100).unwrap();
        assert_eq!((c.xmin, c.ymin, c.xmax, c.ymax), (0.0, 0.0, 100.0, 80.0));
        assert_eq!(c.score, 0.8);
    }

    #[test]
    fn test_clamped_outside_image_rejected() {
        let face = FaceBox { xmin: 150.0, ymin: 10.0, xmax: 200.0, ymax: 80.0, score: 0.8 };
        assert!(face.clamped(100, 100).is_err());
        let ok = FaceBox { xmin: 10.0, ymin: 10.0, xmax: 20.0, ymax: 20.0, score: 0.8 };
        assert!(ok.clamped(0, 100).is_err());
    }

    #[test]
    fn test_from_person_trimming() {
        let person = FaceBox::new(100.0, 50.0, 300.0, 550.0, 0.97).unwrap();
        let face = FaceBox::from_person(&person).unwrap();
        assert!((face.xmin - 140.0).abs() < 1e-9);
        assert!((face.xmax - 260.0).abs() < 1e-9);
        assert!((face.ymin - 50.0).abs() < 1e-9);
        assert!((face.ymax - 250.0).abs() < 1e-9);
        assert_eq!(face.score, 0.97);
    }

    #[test]
    fn test_transform_apply_invert() {
        let t = Transform { scale: 2.0, translate_x: 15.0, translate_y: -7.5 };
        let image = (100, 80);
        let canvas = (300, 400);
        let p = t.apply((25.0, 40.0), image, canvas);
        // origin = ((300 - 200) / 2 + 15, (400 - 160) / 2 - 7.5) = (65, 112.5)
        assert!((p.0 - 115.0).abs() < 1e-9);
        assert!((p.1 - 192.5).abs() < 1e-9);
        let back = t.invert(p, image, canvas);
        assert!((back.0 - 25.0).abs() < 1e-9);
        assert!((back.1 - 40.0).abs() < 1e-9);
    }
}
