use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::error::{HepatitisError, Result};
use crate::predictor::{Payload, PredictionResult, Predictor};

#[derive(Parser, Debug)]
#[command(name = "hepatitis-predictor")]
#[command(version)]
#[command(about = "Hepatitis outcome prediction service (web form + JSON API)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and per-environment overrides
    #[arg(short, long, default_value = "config", env = "HEPATITIS_CONFIG_DIR")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve the web form and JSON API (default)
    Serve,
    /// Load the artifacts and report readiness plus the expected schema
    Check,
    /// Run a single prediction from a JSON payload file
    Predict {
        /// Path to a JSON object mapping feature names to values
        #[arg(short, long)]
        payload: PathBuf,
    },
}

/// Readiness report printed by `check`; fails when the artifacts did not load.
pub fn check_artifacts(predictor: &Predictor) -> Result<String> {
    if let Some(err) = predictor.startup_error() {
        return Err(HepatitisError::Other(anyhow::anyhow!(
            "model artifacts not loaded: {err}"
        )));
    }
    let schema = predictor.schema()?;
    let mut report = format!(
        "Models loaded. {} expected features:\n",
        schema.expected_features.len()
    );
    for name in schema.expected_features.iter() {
        let marker = if schema.binary_features.iter().any(|b| b == name) {
            " (binary: 1 = si, 2 = no)"
        } else {
            ""
        };
        report.push_str(&format!("  - {name}{marker}\n"));
    }
    Ok(report)
}

pub fn read_payload(path: &Path) -> Result<Payload> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    match value {
        serde_json::Value::Object(payload) => Ok(payload),
        _ => Err(HepatitisError::Other(anyhow::anyhow!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

pub fn predict_from_file(predictor: &Predictor, path: &Path) -> Result<PredictionResult> {
    let payload = read_payload(path)?;
    Ok(predictor.predict(&payload)?)
}
