//! EULA acceptance endpoint.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use veriscan_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptEulaRequest {
    pub submission_id: Uuid,
    pub user_id: Uuid,
}

/// Record acceptance of the current EULA version on both the submission and
/// the acting user. Safe to call repeatedly; existing stamps are kept.
#[tracing::instrument(skip(state, request), fields(submission_id = %request.submission_id))]
pub async fn accept_eula(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AcceptEulaRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = state
        .submission_repository
        .get_by_id(request.submission_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Submission {} not found", request.submission_id))
        })?;
    let tenant = state
        .tenant_repository
        .get_by_id(submission.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", submission.tenant_id)))?;

    state
        .eula_gate
        .confirm(&tenant, request.submission_id, request.user_id)
        .await?;

    let info = state.eula_gate.current_version().await?;
    Ok(Json(serde_json::json!({
        "version": info.version,
        "url": info.url,
    })))
}
