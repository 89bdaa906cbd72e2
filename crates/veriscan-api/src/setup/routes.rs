//! Route configuration and setup

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Callback payloads are small JSON bodies; anything larger is noise.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v0/callbacks/{tenant_id}",
            post(handlers::callbacks::receive_callback),
        )
        .route("/api/v0/status", post(handlers::status::query_status))
        .route("/api/v0/status/stream", get(handlers::status::stream_status))
        .route("/api/v0/eula/accept", post(handlers::eula::accept_eula))
        .route(
            "/api/v0/documents/{id}/refresh",
            post(handlers::documents::refresh_document),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
