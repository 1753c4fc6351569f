// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{SESSION_HEADER, result, stage},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Nests the diagnosis endpoints under /api/diagnosis.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (session registry + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let session_header = HeaderName::from_static(SESSION_HEADER);

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, session_header.clone()])
        .expose_headers([session_header]);

    let diagnosis_routes = Router::new()
        .route("/stage/{stage}", post(stage::submit_stage))
        .route("/result", get(result::get_result))
        .route("/session", delete(result::reset_session));

    Router::new()
        .nest("/api/diagnosis", diagnosis_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
