//! Detector output and the policy that turns it into a single face box.

use crate::error::{PhotoError, Result};
use crate::types::FaceBox;
use serde::{Deserialize, Serialize};

/// Detector label for a face detection.
pub const LABEL_FACE: &str = "face";

/// Detector label for a whole-person detection.
pub const LABEL_PERSON: &str = "person";

/// One detector output entry. Its confidence is the box's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub bbox: FaceBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: FaceBox) -> Self {
        Self { label: label.into(), bbox }
    }

    pub fn score(&self) -> f64 {
        self.bbox.score
    }

    fn is(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}

fn most_confident<'a>(detections: &'a [Detection], label: &str) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|d| d.is(label) && d.score().is_finite())
        .max_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(std::cmp::Ordering::Equal))
}

/// Pick the face box to work with from a detector's output.
///
/// A `face` detection is used directly. Without one, the most confident
/// `person` detection is trimmed to its estimated face region. The result is
/// clamped to the image bounds.
pub fn select_face_box(detections: &[Detection], width: u32, height: u32) -> Result<FaceBox> {
    if let Some(face) = most_confident(detections, LABEL_FACE) {
        tracing::debug!(score = face.score(), "using face detection");
        return face.bbox.clamped(width, height);
    }
    if let Some(person) = most_confident(detections, LABEL_PERSON) {
        tracing::debug!(score = person.score(), "estimating face from person detection");
        return FaceBox::from_person(&person.bbox.clamped(width, height)?)?.clamped(width, height);
    }
    Err(PhotoError::NoSubjectDetected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, xmin: f64, ymin: f64, xmax: f64, ymax: f64, score: f64) -> Detection {
        Detection::new(label, FaceBox::new(xmin, ymin, xmax, ymax, score).unwrap())
    }

    #[test]
    fn test_face_preferred_over_person() {
        let dets = vec![
            det("person", 0.0, 0.0, 400.0, 600.0, 0.99),
            det("face", 150.0, 100.0, 250.0, 230.0, 0.7),
        ];
        let face = select_face_box(&dets, 400, 600).unwrap();
        assert_eq!((face.xmin, face.ymin, face.xmax, face.ymax), (150.0, 100.0, 250.0, 230.0));
    }

    #[test]
    fn test_most_confident_person_trimmed() {
        let dets = vec![
            det("person", 0.0, 0.0, 100.0, 100.0, 0.6),
            det("person", 100.0, 0.0, 300.0, 500.0, 0.9),
            det("dog", 0.0, 0.0, 50.0, 50.0, 0.99),
        ];
        let face = select_face_box(&dets, 400, 600).unwrap();
        assert!((face.xmin - 140.0).abs() < 1e-9);
        assert!((face.xmax - 260.0).abs() < 1e-9);
        assert!((face.ymax - 200.0).abs() < 1e-9);
        assert_eq!(face.score, 0.9);
    }

    #[test]
    fn test_no_subject() {
        assert_eq!(select_face_box(&[], 100, 100), Err(PhotoError::NoSubjectDetected));
        let dets = vec![det("cat", 0.0, 0.0, 10.0, 10.0, 0.9)];
        assert_eq!(select_face_box(&dets, 100, 100), Err(PhotoError::NoSubjectDetected));
    }

    #[test]
    fn test_selected_box_is_clamped() {
        let dets = vec![Detection::new(
            "face",
            FaceBox { xmin: -10.0, ymin: -10.0, xmax: 60.0, ymax: 70.0, score: 0.8 },
        )];
        let face = select_face_box(&dets, 50, 50).unwrap();
        assert_eq!((face.xmin, face.ymin, face.xmax, face.ymax), (0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_ranking_follows_box_score() {
        // A stray top-level score is not a field and cannot outrank the box.
        let dets: Vec<Detection> = ["0.2", "0.9"]
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let x = 100.0 * i as f64;
                let doc = format!(
                    "label = \"face\"\nscore = 0.99\n[bbox]\nxmin = {x:.1}\nymin = 0.0\nxmax = {:.1}\nymax = 80.0\nscore = {score}\n",
                    x + 60.0
                );
                toml::from_str(&doc).unwrap()
            })
            .collect();
        assert_eq!(dets[0].score(), 0.2);
        assert_eq!(dets[1].score(), 0.9);

        let face = select_face_box(&dets, 400, 400).unwrap();
        assert_eq!((face.xmin, face.score), (100.0, 0.9));
    }
}
