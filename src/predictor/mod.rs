//! Hepatitis outcome predictor.
//!
//! Owns the fitted classifier and scaler, derives the feature order, and turns
//! a raw payload into a [`PredictionResult`]. Construction happens once; a
//! failed load leaves the predictor permanently not ready for the lifetime of
//! the process.

pub mod coerce;
pub mod schema;

pub use coerce::coerce_f64;
pub use schema::{
    is_binary_feature, sorted_binary_features, FeatureSchema, Payload, SchemaDescription,
    BINARY_FEATURES, BINARY_NO_VALUE, BINARY_YES_VALUE, FALLBACK_FEATURE_ORDER,
};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::config::ArtifactConfig;
use crate::error::{ArtifactError, PredictionError};
use crate::ml::{Classifier, ClassifierArtifact, Scaler, ScalerArtifact};

/// Human readable outcome per raw class label.
pub const PREDICTION_LABELS: [(&str, &str); 2] = [("1", "Muere"), ("2", "Vive")];
pub const UNKNOWN_LABEL: &str = "Desconocido";

pub fn label_for(prediction: &str) -> &'static str {
    PREDICTION_LABELS
        .iter()
        .find(|(raw, _)| *raw == prediction)
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN_LABEL)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub prediction_label: String,
    /// Empty when the classifier cannot estimate probabilities.
    pub probabilities: BTreeMap<String, f64>,
    pub feature_order: FeatureSchema,
}

#[derive(Debug)]
pub struct Predictor {
    model: Option<Box<dyn Classifier>>,
    scaler: Option<Box<dyn Scaler>>,
    feature_order: FeatureSchema,
    startup_error: Option<ArtifactError>,
}

impl Predictor {
    /// Load both artifacts from disk. Never fails: a load error is kept as
    /// the startup error and the predictor stays not ready.
    pub fn load(config: &ArtifactConfig) -> Self {
        match Self::load_artifacts(config) {
            Ok((model, scaler)) => {
                info!(
                    model = %config.model_path.display(),
                    model_kind = model.kind(),
                    scaler = %config.scaler_path.display(),
                    scaler_kind = scaler.kind(),
                    "Model artifacts loaded"
                );
                Self::from_artifacts(Box::new(model), Box::new(scaler))
            }
            Err(e) => {
                error!("Failed to load model artifacts: {e}");
                Self::failed(e)
            }
        }
    }

    fn load_artifacts(
        config: &ArtifactConfig,
    ) -> Result<(ClassifierArtifact, ScalerArtifact), ArtifactError> {
        let model = ClassifierArtifact::from_file(&config.model_path)?;
        let scaler = ScalerArtifact::from_file(&config.scaler_path)?;
        Ok((model, scaler))
    }

    /// Build a ready predictor from already loaded artifacts.
    pub fn from_artifacts(model: Box<dyn Classifier>, scaler: Box<dyn Scaler>) -> Self {
        let feature_order = match scaler.feature_names().and_then(FeatureSchema::from_names) {
            Some(schema) => schema,
            None => {
                warn!(
                    "Scaler does not record usable feature names, assuming the built-in order of {} features",
                    FALLBACK_FEATURE_ORDER.len()
                );
                FeatureSchema::fallback()
            }
        };

        if model.n_features() != feature_order.len() || scaler.n_features() != feature_order.len()
        {
            warn!(
                expected = feature_order.len(),
                model = model.n_features(),
                scaler = scaler.n_features(),
                "Artifact widths disagree with the feature order; predictions will fail"
            );
        }

        Self {
            model: Some(model),
            scaler: Some(scaler),
            feature_order,
            startup_error: None,
        }
    }

    /// A predictor whose artifacts could not be loaded.
    pub fn failed(error: ArtifactError) -> Self {
        Self {
            model: None,
            scaler: None,
            feature_order: FeatureSchema::fallback(),
            startup_error: Some(error),
        }
    }

    pub fn ready(&self) -> bool {
        self.startup_error.is_none() && self.model.is_some() && self.scaler.is_some()
    }

    pub fn startup_error(&self) -> Option<&ArtifactError> {
        self.startup_error.as_ref()
    }

    pub fn feature_order(&self) -> &FeatureSchema {
        &self.feature_order
    }

    pub fn example_payload(&self) -> Payload {
        self.feature_order.example_payload()
    }

    pub fn schema(&self) -> Result<SchemaDescription, PredictionError> {
        if !self.ready() {
            return Err(PredictionError::NotReady);
        }
        Ok(SchemaDescription {
            expected_features: self.feature_order.clone(),
            example_payload: self.example_payload(),
            binary_features: sorted_binary_features(),
        })
    }

    fn artifacts(&self) -> Result<(&dyn Classifier, &dyn Scaler), PredictionError> {
        if self.startup_error.is_some() {
            return Err(PredictionError::NotReady);
        }
        match (&self.model, &self.scaler) {
            (Some(model), Some(scaler)) => Ok((model.as_ref(), scaler.as_ref())),
            _ => Err(PredictionError::NotReady),
        }
    }

    /// Validate `payload` against the feature order and apply the scaler.
    ///
    /// Readiness is checked before any feature; features are checked in
    /// schema order and the first failure is returned.
    pub fn to_scaled_row(&self, payload: &Payload) -> Result<Vec<f64>, PredictionError> {
        let (_, scaler) = self.artifacts()?;

        let mut values = Vec::with_capacity(self.feature_order.len());
        for feature in self.feature_order.iter() {
            let raw = payload
                .get(feature)
                .ok_or_else(|| PredictionError::MissingFeature(feature.to_string()))?;
            let value = coerce_f64(raw)
                .ok_or_else(|| PredictionError::NonNumericValue(feature.to_string()))?;
            values.push(value);
        }

        let scaled = scaler.transform(&values)?;
        // a finite input can still overflow once scaled
        if let Some(idx) = scaled.iter().position(|v| !v.is_finite()) {
            let feature = self.feature_order.names().get(idx).cloned().unwrap_or_default();
            return Err(PredictionError::NonNumericValue(feature));
        }
        Ok(scaled)
    }

    pub fn predict(&self, payload: &Payload) -> Result<PredictionResult, PredictionError> {
        let scaled = self.to_scaled_row(payload)?;
        let (model, _) = self.artifacts()?;

        let prediction = model.classify(&scaled)?.to_string();

        let probabilities = match model.estimate_probabilities(&scaled) {
            Ok(scores) => scores
                .into_iter()
                .map(|(label, p)| (label.to_string(), p))
                .collect(),
            Err(e) => {
                debug!("Probability estimates unavailable: {e}");
                BTreeMap::new()
            }
        };

        let prediction_label = label_for(&prediction).to_string();
        debug!(%prediction, %prediction_label, "Prediction served");

        Ok(PredictionResult {
            prediction,
            prediction_label,
            probabilities,
            feature_order: self.feature_order.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::ml::{ClassLabel, LinearModel, StandardScaler};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn identity_scaler(names: Option<Value>, width: usize) -> ScalerArtifact {
        ScalerArtifact::StandardScaler(StandardScaler {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
            with_mean: true,
            with_std: true,
            feature_names_in: names,
        })
    }

    /// Score is `1 - Bilirubin`: above 1.0 the score goes negative and predicts "1".
    fn bilirubin_model(schema: &FeatureSchema) -> ClassifierArtifact {
        let mut coef = vec![0.0; schema.len()];
        let idx = schema.iter().position(|n| n == "Bilirubin").unwrap();
        coef[idx] = -1.0;
        ClassifierArtifact::LogisticRegression(LinearModel {
            classes: vec![ClassLabel::new("1"), ClassLabel::new("2")],
            coef: vec![coef],
            intercept: vec![1.0],
        })
    }

    fn ready_predictor() -> Predictor {
        let schema = FeatureSchema::fallback();
        Predictor::from_artifacts(
            Box::new(bilirubin_model(&schema)),
            Box::new(identity_scaler(None, schema.len())),
        )
    }

    fn missing_artifacts() -> Predictor {
        Predictor::load(&ArtifactConfig {
            model_path: PathBuf::from("does/not/exist/model.json"),
            scaler_path: PathBuf::from("does/not/exist/scaler.json"),
        })
    }

    #[derive(Debug)]
    struct BrokenProbabilities;

    impl Classifier for BrokenProbabilities {
        fn classes(&self) -> &[ClassLabel] {
            &[]
        }

        fn n_features(&self) -> usize {
            FALLBACK_FEATURE_ORDER.len()
        }

        fn classify(&self, _row: &[f64]) -> Result<ClassLabel, InferenceError> {
            Ok(ClassLabel::new("3"))
        }

        fn estimate_probabilities(
            &self,
            _row: &[f64],
        ) -> Result<Vec<(ClassLabel, f64)>, InferenceError> {
            Err(InferenceError::NonFinite("test"))
        }
    }

    #[test]
    fn predicts_with_fallback_schema() {
        let predictor = ready_predictor();
        assert!(predictor.ready());

        let mut payload = predictor.example_payload();
        payload.insert("Bilirubin".into(), json!(3.5));
        payload.insert("Age".into(), json!(45));

        let result = predictor.predict(&payload).unwrap();
        assert_eq!(result.prediction, "1");
        assert_eq!(result.prediction_label, "Muere");
        assert_eq!(result.feature_order, FeatureSchema::fallback());
        assert_eq!(result.probabilities.len(), 2);
        let total: f64 = result.probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_bilirubin_survives() {
        let predictor = ready_predictor();
        let mut payload = predictor.example_payload();
        payload.insert("Bilirubin".into(), json!("0.5"));
        let result = predictor.predict(&payload).unwrap();
        assert_eq!(result.prediction, "2");
        assert_eq!(result.prediction_label, "Vive");
    }

    #[test]
    fn missing_feature_names_the_feature() {
        let predictor = ready_predictor();
        for name in FALLBACK_FEATURE_ORDER {
            let mut payload = predictor.example_payload();
            payload.remove(name);
            assert_eq!(
                predictor.predict(&payload),
                Err(PredictionError::MissingFeature(name.to_string()))
            );
        }
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let predictor = ready_predictor();
        let mut payload = predictor.example_payload();
        payload.insert("Albumin".into(), json!("abc"));
        assert_eq!(
            predictor.predict(&payload),
            Err(PredictionError::NonNumericValue("Albumin".to_string()))
        );

        payload.insert("Albumin".into(), Value::Null);
        assert!(matches!(
            predictor.predict(&payload),
            Err(PredictionError::NonNumericValue(_))
        ));
    }

    #[test]
    fn first_failing_feature_in_schema_order_wins() {
        let predictor = ready_predictor();
        let mut payload = predictor.example_payload();
        payload.insert("Sex".into(), json!("x"));
        payload.remove("Protime");
        assert_eq!(
            predictor.predict(&payload),
            Err(PredictionError::NonNumericValue("Sex".to_string()))
        );
    }

    #[test]
    fn value_overflowing_the_scaler_is_non_numeric() {
        let schema = FeatureSchema::fallback();
        let mut scaler = identity_scaler(None, schema.len());
        if let ScalerArtifact::StandardScaler(s) = &mut scaler {
            s.scale = vec![0.5; schema.len()];
        }
        let predictor =
            Predictor::from_artifacts(Box::new(bilirubin_model(&schema)), Box::new(scaler));

        let mut payload = predictor.example_payload();
        payload.insert("Sex".into(), json!(1.7e308));
        assert_eq!(
            predictor.predict(&payload),
            Err(PredictionError::NonNumericValue("Sex".to_string()))
        );
    }

    #[test]
    fn invalid_classifier_fails_the_request_without_panicking() {
        let schema = FeatureSchema::fallback();
        let one_class = LinearModel {
            classes: vec![ClassLabel::new("1")],
            coef: vec![vec![0.0; schema.len()]],
            intercept: vec![1.0],
        };
        let predictor = Predictor::from_artifacts(
            Box::new(ClassifierArtifact::LogisticRegression(one_class)),
            Box::new(identity_scaler(None, schema.len())),
        );
        assert!(matches!(
            predictor.predict(&predictor.example_payload()),
            Err(PredictionError::Inference(InferenceError::ClassIndex { index: 1, classes: 1 }))
        ));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let predictor = ready_predictor();
        let mut payload = predictor.example_payload();
        payload.insert("Unrelated".into(), json!("not a number"));
        assert!(predictor.predict(&payload).is_ok());
    }

    #[test]
    fn feature_order_comes_from_scaler_names() {
        let names: Vec<String> = FALLBACK_FEATURE_ORDER.iter().rev().map(|s| s.to_string()).collect();
        let schema = FeatureSchema::from_names(names.clone()).unwrap();
        let predictor = Predictor::from_artifacts(
            Box::new(bilirubin_model(&schema)),
            Box::new(identity_scaler(Some(json!(names)), schema.len())),
        );
        assert_eq!(predictor.feature_order(), &schema);
        assert_eq!(predictor.feature_order().names()[0], "Estado_Civil");

        let result = predictor.predict(&predictor.example_payload()).unwrap();
        assert_eq!(result.feature_order, schema);
    }

    #[test]
    fn malformed_scaler_names_fall_back() {
        let width = FALLBACK_FEATURE_ORDER.len();
        let schema = FeatureSchema::fallback();
        let predictor = Predictor::from_artifacts(
            Box::new(bilirubin_model(&schema)),
            Box::new(identity_scaler(Some(json!({"not": "a list"})), width)),
        );
        assert_eq!(predictor.feature_order(), &schema);
    }

    #[test]
    fn probability_failures_degrade_to_empty_map() {
        let predictor = Predictor::from_artifacts(
            Box::new(BrokenProbabilities),
            Box::new(identity_scaler(None, FALLBACK_FEATURE_ORDER.len())),
        );
        let result = predictor.predict(&predictor.example_payload()).unwrap();
        assert!(result.probabilities.is_empty());
        assert_eq!(result.prediction, "3");
        assert_eq!(result.prediction_label, UNKNOWN_LABEL);
    }

    #[test]
    fn classifier_without_probabilities_returns_empty_map() {
        let schema = FeatureSchema::fallback();
        let ClassifierArtifact::LogisticRegression(linear) = bilirubin_model(&schema) else {
            unreachable!()
        };
        let predictor = Predictor::from_artifacts(
            Box::new(ClassifierArtifact::LinearSvc(linear)),
            Box::new(identity_scaler(None, schema.len())),
        );
        let result = predictor.predict(&predictor.example_payload()).unwrap();
        assert!(result.probabilities.is_empty());
        assert_eq!(result.prediction_label, "Vive");
    }

    #[test]
    fn width_mismatch_is_an_inference_error() {
        let predictor = Predictor::from_artifacts(
            Box::new(bilirubin_model(&FeatureSchema::fallback())),
            Box::new(identity_scaler(None, 3)),
        );
        assert!(predictor.ready());
        assert!(matches!(
            predictor.predict(&predictor.example_payload()),
            Err(PredictionError::Inference(
                InferenceError::DimensionMismatch { .. }
            ))
        ));
    }

    #[test]
    fn missing_artifacts_leave_predictor_not_ready() {
        let predictor = missing_artifacts();
        assert!(!predictor.ready());
        assert!(matches!(
            predictor.startup_error(),
            Some(ArtifactError::Io { .. })
        ));
        assert_eq!(predictor.feature_order(), &FeatureSchema::fallback());
        assert_eq!(predictor.schema().unwrap_err(), PredictionError::NotReady);
    }

    #[test]
    fn not_ready_is_reported_before_feature_validation() {
        let predictor = missing_artifacts();
        assert_eq!(
            predictor.predict(&Payload::new()),
            Err(PredictionError::NotReady)
        );
    }

    #[test]
    fn schema_lists_sorted_binary_features() {
        let schema = ready_predictor().schema().unwrap();
        assert_eq!(schema.binary_features.len(), 12);
        assert_eq!(schema.binary_features, sorted_binary_features());
        assert_eq!(schema.expected_features.len(), 21);
        assert_eq!(schema.example_payload.len(), 21);
    }

    #[test]
    fn loads_artifacts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let scaler_path = dir.path().join("scaler.json");
        std::fs::write(
            &model_path,
            json!({
                "kind": "logistic_regression",
                "classes": [1, 2],
                "coef": [[0.0, -1.0]],
                "intercept": [1.0]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            &scaler_path,
            json!({
                "kind": "standard_scaler",
                "mean": [40.0, 1.0],
                "scale": [10.0, 1.0],
                "feature_names_in": ["Age", "Bilirubin"]
            })
            .to_string(),
        )
        .unwrap();

        let predictor = Predictor::load(&ArtifactConfig {
            model_path,
            scaler_path,
        });
        assert!(predictor.ready());
        assert_eq!(predictor.feature_order().names(), ["Age", "Bilirubin"]);

        let payload: Payload =
            serde_json::from_value(json!({"Age": 45, "Bilirubin": 1.5})).unwrap();
        let result = predictor.predict(&payload).unwrap();
        // scaled Bilirubin = 0.5 -> score 0.5 -> class "2"
        assert_eq!(result.prediction, "2");
        assert_eq!(result.prediction_label, "Vive");
    }

    #[test]
    fn corrupt_artifact_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        std::fs::write(&model_path, "not json").unwrap();

        let predictor = Predictor::load(&ArtifactConfig {
            model_path,
            scaler_path: dir.path().join("scaler.json"),
        });
        assert!(!predictor.ready());
        assert!(matches!(
            predictor.startup_error(),
            Some(ArtifactError::Format { .. })
        ));
    }

    #[test]
    fn label_lookup() {
        assert_eq!(label_for("1"), "Muere");
        assert_eq!(label_for("2"), "Vive");
        assert_eq!(label_for("2.0"), "Desconocido");
    }
}
