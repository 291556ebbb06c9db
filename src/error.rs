use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the prediction service
#[derive(Error, Debug)]
pub enum HepatitisError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Model artifact errors
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for HepatitisError
pub type Result<T> = std::result::Result<T, HepatitisError>;

/// Failure to load a serialized classifier or scaler at startup
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode artifact {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Errors raised inside the scaler or classifier while running a row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{stage} input dim mismatch: got {got}, expected {expected}")]
    DimensionMismatch {
        stage: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("class index {index} out of range for {classes} classes")]
    ClassIndex { index: usize, classes: usize },

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("non-finite value produced by {0}")]
    NonFinite(&'static str),
}

/// Request-scoped prediction failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Artifacts are not loaded")]
    NotReady,

    #[error("missing feature {0}")]
    MissingFeature(String),

    #[error("Feature {0} must be numeric")]
    NonNumericValue(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
