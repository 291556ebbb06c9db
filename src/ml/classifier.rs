//! Fitted classifiers exported as JSON.
//!
//! Probability estimation is an optional capability: `estimate_probabilities`
//! defaults to `InferenceError::Unsupported` and only the probabilistic
//! artifact kinds override it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

use super::dense::{sigmoid, softmax, DenseNetwork};
use super::read_json_artifact;
use crate::error::{ArtifactError, InferenceError};

/// Class label as emitted by the training pipeline, kept in its string form.
///
/// Integer labels become `"1"`, float labels keep their decimal point
/// (`1.0` becomes `"1.0"`), strings are used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Self(if b { "True" } else { "False" }.to_string())),
            other => Err(D::Error::custom(format!(
                "class label must be a number or string, got {other}"
            ))),
        }
    }
}

/// A fitted classifier over a fixed-width, already scaled feature row.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn classes(&self) -> &[ClassLabel];

    fn n_features(&self) -> usize;

    fn classify(&self, row: &[f64]) -> Result<ClassLabel, InferenceError>;

    /// Per-class probabilities, in `classes()` order.
    fn estimate_probabilities(
        &self,
        _row: &[f64],
    ) -> Result<Vec<(ClassLabel, f64)>, InferenceError> {
        Err(InferenceError::Unsupported(
            "probability estimates".to_string(),
        ))
    }
}

/// Linear decision function shared by logistic regression and linear SVMs.
///
/// Binary problems carry a single coefficient row (positive score selects
/// `classes[1]`); multiclass problems carry one row per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<ClassLabel>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearModel {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;

        let expected_rows = if self.classes.len() == 2 {
            1
        } else {
            self.classes.len()
        };
        if self.coef.len() != expected_rows {
            return Err(format!(
                "coef has {} rows, expected {expected_rows} for {} classes",
                self.coef.len(),
                self.classes.len()
            ));
        }
        if self.intercept.len() != expected_rows {
            return Err(format!(
                "intercept len {} != coef rows {expected_rows}",
                self.intercept.len()
            ));
        }

        let width = self.n_features();
        if width == 0 {
            return Err("coef rows must not be empty".to_string());
        }
        for (r, row) in self.coef.iter().enumerate() {
            if row.len() != width {
                return Err(format!("coef row {r} len {} != {width}", row.len()));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(format!("coef row {r} contains non-finite values"));
            }
        }
        if self.intercept.iter().any(|v| !v.is_finite()) {
            return Err("intercept contains non-finite values".to_string());
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coef.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn decision_function(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_width("linear model", row, self.n_features())?;
        if self.intercept.len() != self.coef.len() {
            return Err(InferenceError::DimensionMismatch {
                stage: "linear model intercept",
                got: self.intercept.len(),
                expected: self.coef.len(),
            });
        }
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| b + w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>())
            .collect();
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(InferenceError::NonFinite("linear model"));
        }
        Ok(scores)
    }

    fn label_for_scores(&self, scores: &[f64]) -> Result<ClassLabel, InferenceError> {
        let idx = match scores {
            [score] => usize::from(*score > 0.0),
            _ => argmax(scores),
        };
        class_at(&self.classes, idx)
    }
}

/// Multi-layer perceptron whose last layer emits raw class scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpModel {
    pub classes: Vec<ClassLabel>,
    pub network: DenseNetwork,
}

impl MlpModel {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        self.network.validate()?;

        let out = self.network.output_dim();
        let binary_ok = self.classes.len() == 2 && out == 1;
        if !binary_ok && out != self.classes.len() {
            return Err(format!(
                "network output_dim {out} does not match {} classes",
                self.classes.len()
            ));
        }
        Ok(())
    }

    fn probabilities(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let scores = self.network.forward(row)?;
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(InferenceError::NonFinite("mlp"));
        }
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&scores))
    }
}

/// Classifier artifact as written by the export step, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LinearModel),
    LinearSvc(LinearModel),
    Mlp(MlpModel),
}

impl ClassifierArtifact {
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
            Self::LogisticRegression(m) | Self::LinearSvc(m) => m.validate(),
            Self::Mlp(m) => m.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::LinearSvc(_) => "linear_svc",
            Self::Mlp(_) => "mlp",
        }
    }
}

impl Classifier for ClassifierArtifact {
    fn classes(&self) -> &[ClassLabel] {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => &m.classes,
            Self::Mlp(m) => &m.classes,
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => m.n_features(),
            Self::Mlp(m) => m.network.input_dim,
        }
    }

    fn classify(&self, row: &[f64]) -> Result<ClassLabel, InferenceError> {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => {
                let scores = m.decision_function(row)?;
                m.label_for_scores(&scores)
            }
            Self::Mlp(m) => {
                let probs = m.probabilities(row)?;
                class_at(&m.classes, argmax(&probs))
            }
        }
    }

    fn estimate_probabilities(
        &self,
        row: &[f64],
    ) -> Result<Vec<(ClassLabel, f64)>, InferenceError> {
        let (classes, probs) = match self {
            Self::LogisticRegression(m) => {
                let scores = m.decision_function(row)?;
                let probs = if scores.len() == 1 {
                    let p = sigmoid(scores[0]);
                    vec![1.0 - p, p]
                } else {
                    softmax(&scores)
                };
                (&m.classes, probs)
            }
            Self::LinearSvc(_) => {
                return Err(InferenceError::Unsupported(
                    "linear_svc has no probability estimates".to_string(),
                ))
            }
            Self::Mlp(m) => (&m.classes, m.probabilities(row)?),
        };
        if probs.len() != classes.len() {
            return Err(InferenceError::DimensionMismatch {
                stage: "class probabilities",
                got: probs.len(),
                expected: classes.len(),
            });
        }
        Ok(classes.iter().cloned().zip(probs).collect())
    }
}

fn validate_classes(classes: &[ClassLabel]) -> Result<(), String> {
    if classes.len() < 2 {
        return Err(format!("expected at least 2 classes, got {}", classes.len()));
    }
    for (i, label) in classes.iter().enumerate() {
        if classes[..i].contains(label) {
            return Err(format!("duplicate class label {label}"));
        }
    }
    Ok(())
}

fn class_at(classes: &[ClassLabel], index: usize) -> Result<ClassLabel, InferenceError> {
    classes
        .get(index)
        .cloned()
        .ok_or(InferenceError::ClassIndex {
            index,
            classes: classes.len(),
        })
}

fn check_width(stage: &'static str, row: &[f64], expected: usize) -> Result<(), InferenceError> {
    if row.len() != expected {
        return Err(InferenceError::DimensionMismatch {
            stage,
            got: row.len(),
            expected,
        });
    }
    Ok(())
}

// First index wins on ties, matching numpy's argmax.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::dense::{Activation, DenseLayer};
    use serde_json::json;

    fn binary_linear() -> LinearModel {
        LinearModel {
            classes: vec![ClassLabel::new("1"), ClassLabel::new("2")],
            coef: vec![vec![1.0, -1.0]],
            intercept: vec![0.0],
        }
    }

    #[test]
    fn class_labels_keep_their_json_spelling() {
        let labels: Vec<ClassLabel> = serde_json::from_value(json!([1, 2.0, "vive"])).unwrap();
        assert_eq!(labels[0].as_str(), "1");
        assert_eq!(labels[1].as_str(), "2.0");
        assert_eq!(labels[2].as_str(), "vive");

        assert!(serde_json::from_value::<ClassLabel>(json!(null)).is_err());
    }

    #[test]
    fn logistic_regression_binary_decision_and_probabilities() {
        let clf = ClassifierArtifact::LogisticRegression(binary_linear());
        clf.validate().unwrap();

        assert_eq!(clf.classify(&[2.0, 0.0]).unwrap().as_str(), "2");
        assert_eq!(clf.classify(&[0.0, 2.0]).unwrap().as_str(), "1");

        let probs = clf.estimate_probabilities(&[0.0, 0.0]).unwrap();
        assert_eq!(probs.len(), 2);
        assert_eq!(probs[0].0.as_str(), "1");
        assert!((probs[0].1 - 0.5).abs() < 1e-12);
        assert!((probs[1].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn multiclass_logistic_regression_uses_softmax() {
        let clf = ClassifierArtifact::LogisticRegression(LinearModel {
            classes: vec![
                ClassLabel::new("a"),
                ClassLabel::new("b"),
                ClassLabel::new("c"),
            ],
            coef: vec![vec![1.0], vec![0.0], vec![-1.0]],
            intercept: vec![0.0, 0.0, 0.0],
        });
        clf.validate().unwrap();

        assert_eq!(clf.classify(&[3.0]).unwrap().as_str(), "a");
        let probs = clf.estimate_probabilities(&[3.0]).unwrap();
        let total: f64 = probs.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_svc_does_not_estimate_probabilities() {
        let clf = ClassifierArtifact::LinearSvc(binary_linear());
        assert_eq!(clf.classify(&[2.0, 0.0]).unwrap().as_str(), "2");
        assert!(matches!(
            clf.estimate_probabilities(&[2.0, 0.0]),
            Err(InferenceError::Unsupported(_))
        ));
    }

    #[test]
    fn mlp_binary_output_is_a_logit() {
        let clf = ClassifierArtifact::Mlp(MlpModel {
            classes: vec![ClassLabel::new("1"), ClassLabel::new("2")],
            network: DenseNetwork {
                input_dim: 1,
                layers: vec![DenseLayer {
                    weights: vec![vec![4.0]],
                    bias: vec![0.0],
                    activation: Activation::Linear,
                }],
            },
        });
        clf.validate().unwrap();

        assert_eq!(clf.classify(&[1.0]).unwrap().as_str(), "2");
        assert_eq!(clf.classify(&[-1.0]).unwrap().as_str(), "1");
        let probs = clf.estimate_probabilities(&[1.0]).unwrap();
        assert!(probs[1].1 > 0.9);
    }

    #[test]
    fn rejects_malformed_linear_models() {
        let mut bad = binary_linear();
        bad.intercept = vec![0.0, 1.0];
        assert!(bad.validate().is_err());

        let mut bad = binary_linear();
        bad.classes = vec![ClassLabel::new("1"), ClassLabel::new("1")];
        assert!(bad.validate().is_err());

        let mut bad = binary_linear();
        bad.coef = vec![vec![1.0, f64::NAN]];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn wrong_row_width_is_an_inference_error() {
        let clf = ClassifierArtifact::LogisticRegression(binary_linear());
        assert!(matches!(
            clf.classify(&[1.0]),
            Err(InferenceError::DimensionMismatch { got: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn unvalidated_models_error_instead_of_panicking() {
        let one_class = ClassifierArtifact::LogisticRegression(LinearModel {
            classes: vec![ClassLabel::new("1")],
            coef: vec![vec![0.0, 0.0]],
            intercept: vec![1.0],
        });
        assert!(one_class.validate().is_err());
        assert_eq!(
            one_class.classify(&[0.0, 0.0]),
            Err(InferenceError::ClassIndex { index: 1, classes: 1 })
        );
        assert!(one_class.estimate_probabilities(&[0.0, 0.0]).is_err());

        let extra_rows = ClassifierArtifact::LinearSvc(LinearModel {
            classes: vec![ClassLabel::new("1"), ClassLabel::new("2")],
            coef: vec![vec![0.0], vec![0.0], vec![1.0]],
            intercept: vec![0.0, 0.0, 0.0],
        });
        assert_eq!(
            extra_rows.classify(&[1.0]),
            Err(InferenceError::ClassIndex { index: 2, classes: 2 })
        );

        let short_intercept = ClassifierArtifact::LogisticRegression(LinearModel {
            intercept: vec![],
            ..binary_linear()
        });
        assert!(matches!(
            short_intercept.classify(&[1.0, 0.0]),
            Err(InferenceError::DimensionMismatch { .. })
        ));

        let wide_mlp = ClassifierArtifact::Mlp(MlpModel {
            classes: vec![ClassLabel::new("1"), ClassLabel::new("2")],
            network: DenseNetwork {
                input_dim: 1,
                layers: vec![DenseLayer {
                    weights: vec![vec![0.0], vec![0.0], vec![1.0]],
                    bias: vec![0.0; 3],
                    activation: Activation::Linear,
                }],
            },
        });
        assert_eq!(
            wide_mlp.classify(&[1.0]),
            Err(InferenceError::ClassIndex { index: 2, classes: 2 })
        );
    }

    #[test]
    fn parses_tagged_artifact() {
        let raw = json!({
            "kind": "logistic_regression",
            "classes": [1, 2],
            "coef": [[0.5, -0.25]],
            "intercept": [0.1],
            "metadata": {"trained_with": "sklearn"}
        });
        let clf: ClassifierArtifact = serde_json::from_value(raw).unwrap();
        assert_eq!(clf.kind(), "logistic_regression");
        assert_eq!(clf.n_features(), 2);
        assert_eq!(clf.classes()[1].as_str(), "2");
    }
}
