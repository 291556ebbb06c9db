//! Fitted feature scalers exported as JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::read_json_artifact;
use crate::error::{ArtifactError, InferenceError};

/// A fitted forward transform applied to raw rows before classification.
pub trait Scaler: Send + Sync + fmt::Debug {
    fn n_features(&self) -> usize;

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Input column names recorded at fit time, if the export kept them and
    /// they are usable (strings, unique, one per column).
    fn feature_names(&self) -> Option<Vec<String>> {
        None
    }
}

/// Standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
    /// Kept loosely typed: a malformed value must not fail the load.
    #[serde(default)]
    pub feature_names_in: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.is_empty() {
            return Err("mean must not be empty".to_string());
        }
        if self.scale.len() != self.mean.len() {
            return Err(format!(
                "scale len {} != mean len {}",
                self.scale.len(),
                self.mean.len()
            ));
        }
        if self.mean.iter().any(|v| !v.is_finite()) {
            return Err("mean contains non-finite values".to_string());
        }
        if self.scale.iter().any(|v| !v.is_finite() || *v == 0.0) {
            return Err("scale must be finite and non-zero".to_string());
        }
        Ok(())
    }

    fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(i, x)| {
                let centered = if self.with_mean { x - self.mean[i] } else { *x };
                if self.with_std {
                    centered / self.scale[i]
                } else {
                    centered
                }
            })
            .collect()
    }
}

/// Range scaling: `x * scale + min`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default)]
    pub feature_names_in: Option<serde_json::Value>,
}

impl MinMaxScaler {
    pub fn validate(&self) -> Result<(), String> {
        if self.min.is_empty() {
            return Err("min must not be empty".to_string());
        }
        if self.scale.len() != self.min.len() {
            return Err(format!(
                "scale len {} != min len {}",
                self.scale.len(),
                self.min.len()
            ));
        }
        if self.min.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("min/scale contain non-finite values".to_string());
        }
        Ok(())
    }
}

/// Scaler artifact as written by the export step, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    StandardScaler(StandardScaler),
    MinMaxScaler(MinMaxScaler),
}

impl ScalerArtifact {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let artifact: Self = read_json_artifact(path)?;
        artifact.validate().map_err(|reason| ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::StandardScaler(s) => s.validate(),
            Self::MinMaxScaler(s) => s.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StandardScaler(_) => "standard_scaler",
            Self::MinMaxScaler(_) => "min_max_scaler",
        }
    }

    fn raw_feature_names(&self) -> Option<&serde_json::Value> {
        match self {
            Self::StandardScaler(s) => s.feature_names_in.as_ref(),
            Self::MinMaxScaler(s) => s.feature_names_in.as_ref(),
        }
    }
}

impl Scaler for ScalerArtifact {
    fn n_features(&self) -> usize {
        match self {
            Self::StandardScaler(s) => s.mean.len(),
            Self::MinMaxScaler(s) => s.min.len(),
        }
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if row.len() != self.n_features() {
            return Err(InferenceError::DimensionMismatch {
                stage: "scaler",
                got: row.len(),
                expected: self.n_features(),
            });
        }
        let out = match self {
            Self::StandardScaler(s) if s.scale.len() != s.mean.len() => {
                return Err(InferenceError::DimensionMismatch {
                    stage: "scaler scale",
                    got: s.scale.len(),
                    expected: s.mean.len(),
                })
            }
            Self::StandardScaler(s) => s.transform_row(row),
            Self::MinMaxScaler(s) => row
                .iter()
                .zip(s.scale.iter().zip(&s.min))
                .map(|(x, (scale, min))| x * scale + min)
                .collect(),
        };
        Ok(out)
    }

    fn feature_names(&self) -> Option<Vec<String>> {
        parse_feature_names(self.raw_feature_names()?, self.n_features())
    }
}

fn parse_feature_names(raw: &serde_json::Value, width: usize) -> Option<Vec<String>> {
    let names: Vec<String> = raw
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<_>>()?;

    if names.len() != width {
        return None;
    }
    let mut seen = HashSet::new();
    if !names.iter().all(|n| !n.is_empty() && seen.insert(n.as_str())) {
        return None;
    }
    Some(names)
}
