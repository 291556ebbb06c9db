use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{state::AppState, types::*};
use crate::predictor::{PredictionResult, SchemaDescription};

/// GET /api/hepatitis/health
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let predictor = &state.predictor;
    let ready = predictor.ready();

    let resp = HealthResponse {
        status: if ready { "ok" } else { "error" }.to_string(),
        model_loaded: ready,
        expected_features: predictor.feature_order().clone(),
        error: predictor.startup_error().map(|e| e.to_string()),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(resp))
}

/// GET /api/hepatitis/schema
pub async fn schema_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<SchemaDescription>, ApiError> {
    state.predictor.schema().map(Json).map_err(|e| {
        let details = state
            .predictor
            .startup_error()
            .map(|se| se.to_string())
            .unwrap_or_else(|| e.to_string());
        api_error_with_details(StatusCode::INTERNAL_SERVER_ERROR, MSG_NOT_READY, details)
    })
}

/// POST /api/hepatitis/predict
pub async fn predict_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    if !state.predictor.ready() {
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_NOT_READY));
    }

    let payload = match body {
        Ok(Json(Value::Object(payload))) => payload,
        Ok(Json(other)) => {
            debug!("Rejected non-object JSON body: {}", json_kind(&other));
            return Err(api_error(StatusCode::BAD_REQUEST, MSG_BODY_NOT_JSON));
        }
        Err(rejection) => {
            debug!("Rejected request body: {rejection}");
            return Err(api_error(StatusCode::BAD_REQUEST, MSG_BODY_NOT_JSON));
        }
    };

    state.predictor.predict(&payload).map(Json).map_err(|e| {
        warn!("Prediction request failed: {e}");
        prediction_error_response(&e)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
