pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod ml;
pub mod predictor;

pub use config::AppConfig;
pub use error::{ArtifactError, HepatitisError, InferenceError, PredictionError, Result};
pub use predictor::{FeatureSchema, Payload, PredictionResult, Predictor, SchemaDescription};
