//! Face-geometry compliance checks against a photo standard.
//!
//! The face box comes from a detector, not from eye landmarks, so every
//! threshold here is a widened band around the nominal standard.

use crate::error::{invalid, Result};
use crate::standards::Standard;
use crate::types::FaceBox;
use serde::{Deserialize, Serialize};

/// Eye line position as a fraction of face height, measured from the top of the face box.
pub const EYE_LINE_FROM_FACE_TOP: f64 = 0.35;

/// Lower bound multiplier applied to the standard's minimum head height.
pub const HEAD_HEIGHT_MIN_TOLERANCE: f64 = 0.8;

/// Upper bound multiplier applied to the standard's maximum head height.
pub const HEAD_HEIGHT_MAX_TOLERANCE: f64 = 1.2;

/// Allowed eye-line deviation in percentage points of photo height.
pub const EYE_LINE_TOLERANCE_PCT: f64 = 15.0;

/// Allowed horizontal offset of the face center, percent of photo width.
pub const CENTER_TOLERANCE_PCT: f64 = 10.0;

pub const MSG_HEAD_TOO_SMALL: &str = "Head is too small: move closer to the camera or zoom in";
pub const MSG_HEAD_TOO_LARGE: &str = "Head is too large: move further from the camera or zoom out";
pub const MSG_EYES_TOO_LOW: &str = "Eyes are too low: move the face up in the frame";
pub const MSG_EYES_TOO_HIGH: &str = "Eyes are too high: move the face down in the frame";
pub const MSG_NOT_CENTERED: &str = "Face is not centered: move it horizontally toward the middle";
pub const MSG_ALL_PASSED: &str = "Photo meets all geometric requirements";

/// Result of checking one face box against one standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub head_height_valid: bool,
    pub eye_line_valid: bool,
    pub centered_valid: bool,
    pub is_valid: bool,
    /// Face height as percent of image height.
    pub head_height_percent: f64,
    /// Estimated eye line as percent of image height, from the bottom edge.
    pub eye_line_percent: f64,
    /// Horizontal distance of the face center from the image center, percent of width.
    pub center_offset_percent: f64,
    /// Remediation hints, head height first, then eye line, then centering.
    pub messages: Vec<String>,
}

/// Estimated eye line y coordinate for a face box.
pub fn eye_line_y(face: &FaceBox) -> f64 {
    face.ymin + face.height() * EYE_LINE_FROM_FACE_TOP
}

/// Check a face box in an `image_width` x `image_height` photo against `standard`.
pub fn validate_compliance(
    face: &FaceBox,
    image_width: u32,
    image_height: u32,
    standard: &Standard,
) -> Result<ComplianceReport> {
    if image_width == 0 || image_height == 0 {
        return Err(invalid(format!(
            "image dimensions must be positive, got {image_width}x{image_height}"
        )));
    }
    let face = FaceBox::new(face.xmin, face.ymin, face.xmax, face.ymax, face.score)?;
    let w = image_width as f64;
    let h = image_height as f64;

    let head_height_percent = face.height() / h * 100.0;
    let eye_line_percent = (h - eye_line_y(&face)) / h * 100.0;
    let center_offset_percent = (face.center_x() - w / 2.0).abs() / w * 100.0;

    let head_min = standard.head_height_min * HEAD_HEIGHT_MIN_TOLERANCE;
    let head_max = standard.head_height_max * HEAD_HEIGHT_MAX_TOLERANCE;
    let head_height_valid = (head_min..=head_max).contains(&head_height_percent);
    let eye_line_valid =
        (eye_line_percent - standard.eye_line_from_bottom).abs() <= EYE_LINE_TOLERANCE_PCT;
    let centered_valid = center_offset_percent <= CENTER_TOLERANCE_PCT;

    let mut messages = Vec::new();
    if !head_height_valid {
        let msg = if head_height_percent < head_min { MSG_HEAD_TOO_SMALL } else { MSG_HEAD_TOO_LARGE };
        messages.push(msg.to_string());
    }
    if !eye_line_valid {
        let msg = if eye_line_percent < standard.eye_line_from_bottom {
            MSG_EYES_TOO_LOW
        } else {
            MSG_EYES_TOO_HIGH
        };
        messages.push(msg.to_string());
    }
    if !centered_valid {
        messages.push(MSG_NOT_CENTERED.to_string());
    }
    if messages.is_empty() {
        messages.push(MSG_ALL_PASSED.to_string());
    }

    let report = ComplianceReport {
        head_height_valid,
        eye_line_valid,
        centered_valid,
        is_valid: head_height_valid && eye_line_valid && centered_valid,
        head_height_percent,
        eye_line_percent,
        center_offset_percent,
        messages,
    };

    tracing::debug!(
        standard = %standard.id,
        head = report.head_height_percent,
        eye_line = report.eye_line_percent,
        center_offset = report.center_offset_percent,
        valid = report.is_valid,
        "compliance checked"
    );

    Ok(report)
}
