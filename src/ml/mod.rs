//! Lightweight ML inference over fitted artifacts exported as JSON.
//!
//! This module is intentionally dependency-light: the artifacts are plain
//! coefficient dumps and every forward pass is a handful of dot products.

pub mod classifier;
pub mod dense;
pub mod scaler;

pub use classifier::{ClassLabel, Classifier, ClassifierArtifact, LinearModel, MlpModel};
pub use dense::{Activation, DenseLayer, DenseNetwork};
pub use scaler::{MinMaxScaler, Scaler, ScalerArtifact, StandardScaler};

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ArtifactError;

pub(crate) fn read_json_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Format {
        path: path.to_path_buf(),
        source,
    })
}
