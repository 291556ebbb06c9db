use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::api::{page::FormPage, state::AppState, types::form_error_message};
use crate::predictor::{
    is_binary_feature, FeatureSchema, Payload, BINARY_NO_VALUE, BINARY_YES_VALUE,
};

/// GET /
pub async fn form_page(State(state): State<AppState>) -> Html<String> {
    let predictor = &state.predictor;
    let values = predictor.example_payload();

    Html(
        FormPage {
            feature_order: predictor.feature_order(),
            values: &values,
            result: None,
            error: None,
            model_ready: predictor.ready(),
            startup_error: predictor.startup_error().map(|e| e.to_string()),
        }
        .render(),
    )
}

/// POST /
pub async fn submit_form(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> Html<String> {
    let predictor = &state.predictor;
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            debug!("Unreadable form body, treating as empty: {rejection}");
            HashMap::new()
        }
    };

    let values = payload_from_form(predictor.feature_order(), &fields);
    let (result, error) = match predictor.predict(&values) {
        Ok(result) => (Some(result), None),
        Err(e) => {
            warn!("Form prediction failed: {e}");
            (None, Some(form_error_message(&e)))
        }
    };

    Html(
        FormPage {
            feature_order: predictor.feature_order(),
            values: &values,
            result: result.as_ref(),
            error: error.as_deref(),
            model_ready: predictor.ready(),
            startup_error: predictor.startup_error().map(|e| e.to_string()),
        }
        .render(),
    )
}

/// Checkbox semantics for binary features (any non-empty value means yes),
/// raw text for everything else. Absent text fields become empty strings and
/// fail numeric coercion downstream.
pub fn payload_from_form(schema: &FeatureSchema, fields: &HashMap<String, String>) -> Payload {
    schema
        .iter()
        .map(|feature| {
            let raw = fields.get(feature);
            let value = if is_binary_feature(feature) {
                let checked = raw.is_some_and(|v| !v.is_empty());
                Value::from(if checked {
                    BINARY_YES_VALUE
                } else {
                    BINARY_NO_VALUE
                })
            } else {
                Value::String(raw.cloned().unwrap_or_default())
            };
            (feature.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkboxes_map_to_one_and_two() {
        let schema = FeatureSchema::fallback();
        let fields = HashMap::from([
            ("Ascites".to_string(), "1".to_string()),
            ("Varices".to_string(), String::new()),
            ("Age".to_string(), "45".to_string()),
        ]);

        let payload = payload_from_form(&schema, &fields);
        assert_eq!(payload.len(), schema.len());
        assert_eq!(payload["Ascites"], Value::from(1));
        assert_eq!(payload["Varices"], Value::from(2));
        assert_eq!(payload["Steroid"], Value::from(2));
        assert_eq!(payload["Age"], Value::from("45"));
        assert_eq!(payload["Bilirubin"], Value::from(""));
    }
}
