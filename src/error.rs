//! Error types for the flow conditioning pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("No input files could be loaded ({attempted} attempted)")]
    NoInputsLoaded { attempted: usize },

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Schema mismatch in {file}: {detail}")]
    SchemaMismatch { file: String, detail: String },

    #[error(
        "Class {class} ({label}) has {members} training member(s), \
         synthesis with these neighbor settings needs at least {required}"
    )]
    ClassTooSmall {
        class: i64,
        label: String,
        members: usize,
        required: usize,
    },

    #[error("Feature '{0}' has zero standard deviation in the training partition")]
    DegenerateFeature(String),

    #[error("Class {class} ({label}) is present in the training data but has no sampling target")]
    UnmappedClass { class: i64, label: String },

    #[error("Sampling target for class {class} is {target}, below its current count {current}")]
    TargetBelowCount {
        class: i64,
        target: usize,
        current: usize,
    },

    #[error("Sampling strategy names class {0}, which is not present in the training data")]
    UnknownClass(i64),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for PrepError {
    fn from(err: polars::error::PolarsError) -> Self {
        PrepError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        PrepError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrepError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrepError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
