//! Error types for the SVM engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SvmError {
    /// Parameter validation failed; the payload is the validator's reason.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Parse error: {0}")]
    ParseError(String),

    /// A model file could be read but its content is not a valid model.
    #[error("Invalid model file: {0}")]
    ModelFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SvmError>;
