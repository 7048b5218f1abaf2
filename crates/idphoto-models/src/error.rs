use idphoto_core::PhotoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {0} (set IDPHOTO_MODEL_DIR or place the ONNX file there)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("{0} model unavailable: {1}")]
    Unavailable(&'static str, String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
    #[error("inference task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl From<ModelError> for PhotoError {
    /// Geometry errors pass through; every model-side failure is `ModelUnavailable`.
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Photo(e) => e,
            other => PhotoError::ModelUnavailable(other.to_string()),
        }
    }
}
