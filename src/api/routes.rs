use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // HTML form
        .route("/", get(handlers::form_page).post(handlers::submit_form))
        // JSON API
        .route("/api/hepatitis/health", get(handlers::health_handler))
        .route("/api/hepatitis/schema", get(handlers::schema_handler))
        .route("/api/hepatitis/predict", post(handlers::predict_handler))
        // Add state, CORS and request tracing
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
