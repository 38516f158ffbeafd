use mediastore_core::AppError;
use mediastore_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Cannot hash empty input")]
    EmptyInput,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

#[cfg(feature = "image")]
impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => ProcessingError::Encode(e.to_string()),
            other => ProcessingError::Decode(other.to_string()),
        }
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::EmptyInput => AppError::EmptyInput(err.to_string()),
            ProcessingError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            ProcessingError::Storage(e) => AppError::from(e),
            other => AppError::ImageProcessing(other.to_string()),
        }
    }
}
