//! Feature layout expected by the fitted artifacts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Raw request record: feature name to a value coercible to `f64`.
pub type Payload = serde_json::Map<String, Value>;

/// Column order assumed when the scaler export does not record its input
/// names. Nothing verifies it against the fitted artifacts.
pub const FALLBACK_FEATURE_ORDER: [&str; 21] = [
    "Age",
    "Sex",
    "Steroid",
    "Antivirals",
    "Fatigue",
    "Malaise",
    "Anorexia",
    "Liver_Big",
    "Liver_Firm",
    "Spleen_Palpable",
    "Spiders",
    "Ascites",
    "Varices",
    "Bilirubin",
    "Alk_Phosphate",
    "Sgot",
    "Albumin",
    "Protime",
    "Histology",
    "Ciudad",
    "Estado_Civil",
];

/// Yes/no features, encoded 1 (yes) / 2 (no) as in the training data.
pub const BINARY_FEATURES: [&str; 12] = [
    "Steroid",
    "Antivirals",
    "Fatigue",
    "Malaise",
    "Anorexia",
    "Liver_Big",
    "Liver_Firm",
    "Spleen_Palpable",
    "Spiders",
    "Ascites",
    "Varices",
    "Histology",
];

pub const BINARY_YES_VALUE: i64 = 1;
pub const BINARY_NO_VALUE: i64 = 2;

pub fn is_binary_feature(name: &str) -> bool {
    BINARY_FEATURES.contains(&name)
}

pub fn sorted_binary_features() -> Vec<String> {
    let mut names: Vec<String> = BINARY_FEATURES.iter().map(|s| s.to_string()).collect();
    names.sort();
    names
}

/// Ordered, unique feature names defining the input row layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn fallback() -> Self {
        Self(FALLBACK_FEATURE_ORDER.iter().map(|s| s.to_string()).collect())
    }

    /// Returns `None` when `names` is empty or repeats a name.
    pub fn from_names(names: Vec<String>) -> Option<Self> {
        if names.is_empty() {
            return None;
        }
        let mut seen = HashSet::new();
        if !names.iter().all(|n| seen.insert(n.as_str())) {
            return None;
        }
        Some(Self(names))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }

    /// Every feature at its neutral value: binary features at the "no" code,
    /// everything else at 0.0. Keys follow schema order.
    pub fn example_payload(&self) -> Payload {
        self.iter()
            .map(|name| {
                let value = if is_binary_feature(name) {
                    BINARY_NO_VALUE as f64
                } else {
                    0.0
                };
                (name.to_string(), Value::from(value))
            })
            .collect()
    }
}

/// Body of `GET /api/hepatitis/schema`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub expected_features: FeatureSchema,
    pub example_payload: Payload,
    pub binary_features: Vec<String>,
}
