//! Portrait matting via ONNX Runtime.
//!
//! The image is stretched to the model's square input and the single-channel
//! matte is returned at model resolution. The compositor stretches it back,
//! so no letterbox bookkeeping is needed.

use crate::error::{ModelError, Result};
use idphoto_core::{Mask, Segment};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const MATTING_INPUT_SIZE: usize = 512;
const MATTING_MEAN: f32 = 127.5;
const MATTING_STD: f32 = 127.5;

/// Label attached to the matte.
pub const MATTE_LABEL: &str = "person";

/// Anything that produces labelled soft masks for an RGB image.
pub trait Segmenter: Send {
    fn segment(&mut self, image: &RgbImage) -> Result<Vec<Segment>>;
}

/// Single-output portrait matting model (MODNet-style).
pub struct MattingSegmenter {
    session: Session,
}

impl MattingSegmenter {
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self> {
        if !model_path.exists() {
            return Err(ModelError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded matting model"
        );

        Ok(Self { session })
    }
}

impl Segmenter for MattingSegmenter {
    fn segment(&mut self, image: &RgbImage) -> Result<Vec<Segment>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ModelError::InferenceFailed("input image is empty".into()));
        }
        let input = preprocess(image);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (shape, matte) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceFailed(format!("matte: {e}")))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let (width, height) = matte_dims(&dims)?;
        let mask = Mask::new(width, height, matte.to_vec())?;

        tracing::debug!(width, height, peak = mask.peak(), "matte extracted");

        Ok(vec![Segment { label: MATTE_LABEL.to_string(), score: 1.0, mask }])
    }
}

/// Stretch to the square model input and normalize to [-1, 1].
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let size = MATTING_INPUT_SIZE as u32;
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    let mut tensor = Array4::<f32>::zeros((1, 3, MATTING_INPUT_SIZE, MATTING_INPUT_SIZE));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (px.0[c] as f32 - MATTING_MEAN) / MATTING_STD;
        }
    }
    tensor
}

/// Width and height of a matte tensor shaped `[.., 1, H, W]` or `[H, W]`.
fn matte_dims(shape: &[i64]) -> Result<(u32, u32)> {
    let bad = || ModelError::InferenceFailed(format!("unexpected matte shape {shape:?}"));
    if shape.len() < 2 {
        return Err(bad());
    }
    if shape.len() > 2 && shape[shape.len() - 3] != 1 {
        return Err(bad());
    }
    let h = u32::try_from(shape[shape.len() - 2]).map_err(|_| bad())?;
    let w = u32::try_from(shape[shape.len() - 1]).map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok((w, h))
}
