//! Local refresh action.
//!
//! The poll-based fallback for when no callback has arrived: re-query the
//! remote service for whichever stage the document is waiting on and apply
//! the answer through the normal state-machine guards.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use veriscan_core::models::DocumentStatus;
use veriscan_core::AppError;
use veriscan_services::{AcceptanceOutcome, SimilarityOutcome};

use crate::error::HttpAppError;
use crate::state::AppState;

#[tracing::instrument(skip(state), fields(document_id = %id))]
pub async fn refresh_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = state
        .document_repository
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

    let message = match document.status {
        DocumentStatus::AwaitingAcceptance => {
            match state.lifecycle.confirm_acceptance(id).await? {
                AcceptanceOutcome::Accepted | AcceptanceOutcome::AlreadyAccepted => {
                    // Acceptance confirmed via poll; continue straight into
                    // scheduling, as a callback delivery would have.
                    state.lifecycle.schedule_similarity(id).await?;
                    "Submission accepted, similarity check scheduled"
                }
                AcceptanceOutcome::Pending(status) => match status {
                    veriscan_core::models::RemoteSubmissionStatus::Created => {
                        "Submission received, queued for processing"
                    }
                    _ => "Submission is still being processed",
                },
            }
        }
        DocumentStatus::SimilarityPending | DocumentStatus::SimilarityAvailable => {
            match state.lifecycle.refresh(id).await? {
                SimilarityOutcome::Applied => "Similarity result updated",
                SimilarityOutcome::Ignored => "Similarity check is still running",
                SimilarityOutcome::Unavailable => "Similarity service unavailable, try again later",
            }
        }
        status => {
            return Err(HttpAppError::from(AppError::InvalidTransition(format!(
                "Nothing to refresh in state {}",
                status
            ))));
        }
    };

    Ok(Json(serde_json::json!({ "message": message })))
}
