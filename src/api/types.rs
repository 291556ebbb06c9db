use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::PredictionError;
use crate::predictor::FeatureSchema;

// ============================================================================
// Error messages
// ============================================================================

pub const MSG_NOT_READY: &str = "Los modelos no estan cargados";
pub const MSG_NON_NUMERIC: &str = "Todos los valores deben ser numericos";
pub const MSG_BODY_NOT_JSON: &str = "El cuerpo debe ser JSON";
pub const MSG_REQUEST_FAILED: &str = "No se pudo procesar la solicitud";
pub const MSG_FORM_FAILED: &str = "No se pudo generar la prediccion";

pub fn missing_feature_message(feature: &str) -> String {
    format!("Falta el campo {feature}")
}

// ============================================================================
// Health Check Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub expected_features: FeatureSchema,
    pub error: Option<String>,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            details: None,
        }),
    )
}

pub fn api_error_with_details(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            details: Some(details.into()),
        }),
    )
}

pub fn prediction_error_response(err: &PredictionError) -> ApiError {
    match err {
        PredictionError::MissingFeature(name) => {
            api_error(StatusCode::BAD_REQUEST, missing_feature_message(name))
        }
        PredictionError::NonNumericValue(_) => api_error(StatusCode::BAD_REQUEST, MSG_NON_NUMERIC),
        PredictionError::NotReady => api_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_NOT_READY),
        PredictionError::Inference(e) => api_error_with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            MSG_REQUEST_FAILED,
            e.to_string(),
        ),
    }
}

/// Inline message shown on the HTML form for a failed prediction.
pub fn form_error_message(err: &PredictionError) -> String {
    match err {
        PredictionError::MissingFeature(name) => missing_feature_message(name),
        PredictionError::NonNumericValue(_) => format!("{MSG_NON_NUMERIC}."),
        PredictionError::NotReady => format!("{MSG_NOT_READY}."),
        PredictionError::Inference(e) => format!("{MSG_FORM_FAILED}: {e}"),
    }
}
