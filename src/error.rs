//! Error types for the coco-map-eval library.

use thiserror::Error;

/// Result type for coco-map-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Error types that can occur while running or scoring an evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error while decoding an image file.
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Error reported by ONNX Runtime.
    #[error("ONNX Runtime error: {0}")]
    SessionError(#[from] ort::Error),

    /// Image data with an unusable shape.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Invalid annotation data.
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// Invalid bounding box coordinates.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Empty dataset provided.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Invalid confidence threshold.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// A model label with no COCO category behind it.
    #[error("Unknown label: {0}")]
    UnknownLabel(i64),

    /// Sample index past the end of the dataset.
    #[error("Sample index {index} out of range for dataset of {len} images")]
    IndexOutOfRange { index: usize, len: usize },

    /// Model produced outputs that cannot be read as scores, labels and boxes.
    #[error("Model output error: {0}")]
    Model(String),

    /// Requested compute device is unknown or not compiled in.
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// An evaluator stage was called before the stage it depends on.
    #[error("Evaluator not ready: {0}")]
    NotReady(&'static str),
}
