use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no subject detected")]
    NoSubjectDetected,
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

pub type Result<T> = std::result::Result<T, PhotoError>;

/// Shorthand for building an `InvalidArgument` error.
pub(crate) fn invalid(msg: impl Into<String>) -> PhotoError {
    PhotoError::InvalidArgument(msg.into())
}
