//! idphoto-models: Face detection and portrait matting for idphoto.
//!
//! Uses SCRFD for face detection and a single-channel matting model for
//! background removal, both running via ONNX Runtime for CPU inference.
//! Each model sits behind an initialize-once [`ModelService`].

pub mod detector;
pub mod engine;
pub mod error;
pub mod segmenter;
pub mod service;

use std::path::PathBuf;

pub use detector::{Detector, ScrfdDetector};
pub use engine::{ComposedSheet, PhotoEngine, PrepareOptions, PreparedPhoto};
pub use error::{ModelError, Result};
pub use segmenter::{MattingSegmenter, Segmenter};
pub use service::{ModelService, ServiceState};

/// SCRFD detector weights inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";

/// Portrait matting weights inside the model directory.
pub const MATTING_MODEL_FILE: &str = "modnet_photographic_portrait_matting.onnx";

/// `$XDG_DATA_HOME/idphoto/models`, falling back to `~/.local/share/idphoto/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("idphoto")
        .join("models")
}
