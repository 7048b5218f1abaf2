use idphoto_core::layout::{DEFAULT_GAP_MM, DEFAULT_MARGIN_MM};
use idphoto_core::{LayoutOptions, Resampling};
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Sheet margin in millimeters.
    pub margin_mm: f64,
    /// Gap between photos in millimeters.
    pub gap_mm: f64,
    /// Resolution scale of the preview sheet written by `process`.
    pub preview_scale: f64,
    /// How low-resolution masks are upscaled.
    pub resampling: Resampling,
    /// Whether sheets get cut guides.
    pub draw_guides: bool,
    /// ONNX Runtime intra-op threads per model.
    pub intra_threads: usize,
}

impl Config {
    /// Load configuration from `IDPHOTO_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("IDPHOTO_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| idphoto_models::default_model_dir());

        let resampling = match std::env::var("IDPHOTO_MASK_RESAMPLING").as_deref() {
            Ok("nearest") => Resampling::Nearest,
            Ok("bilinear") | Err(_) => Resampling::Bilinear,
            Ok(other) => {
                tracing::warn!(value = other, "unknown IDPHOTO_MASK_RESAMPLING, using bilinear");
                Resampling::Bilinear
            }
        };

        Self {
            model_dir,
            margin_mm: env_f64("IDPHOTO_MARGIN_MM", DEFAULT_MARGIN_MM),
            gap_mm: env_f64("IDPHOTO_GAP_MM", DEFAULT_GAP_MM),
            preview_scale: env_f64("IDPHOTO_PREVIEW_SCALE", 0.25),
            resampling,
            draw_guides: std::env::var("IDPHOTO_GUIDES")
                .map(|v| v != "0")
                .unwrap_or(true),
            intra_threads: env_usize("IDPHOTO_INTRA_THREADS", 2).max(1),
        }
    }

    /// Layout options from the configured margin and gap, overridden per call.
    pub fn layout_options(&self, margin_mm: Option<f64>, gap_mm: Option<f64>, scale: f64) -> LayoutOptions {
        LayoutOptions {
            margin_mm: margin_mm.unwrap_or(self.margin_mm),
            gap_mm: gap_mm.unwrap_or(self.gap_mm),
            scale,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_helpers_fall_back() {
        std::env::set_var("IDPHOTO_TEST_F64", "7.5");
        std::env::set_var("IDPHOTO_TEST_BAD_F64", "wide");
        assert_eq!(env_f64("IDPHOTO_TEST_F64", 1.0), 7.5);
        assert_eq!(env_f64("IDPHOTO_TEST_BAD_F64", 1.0), 1.0);
        assert_eq!(env_usize("IDPHOTO_TEST_UNSET_USIZE", 3), 3);
    }

    #[test]
    fn test_layout_overrides() {
        let config = Config {
            model_dir: PathBuf::from("/models"),
            margin_mm: 5.0,
            gap_mm: 2.0,
            preview_scale: 0.25,
            resampling: Resampling::Bilinear,
            draw_guides: true,
            intra_threads: 2,
        };
        let options = config.layout_options(Some(8.0), None, 0.5);
        assert_eq!(options, LayoutOptions { margin_mm: 8.0, gap_mm: 2.0, scale: 0.5 });
    }
}
