//! Status endpoints: point query and bounded SSE stream.

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    response::IntoResponse,
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use veriscan_core::AppError;
use veriscan_services::{negotiate_duration, SnapshotParams};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub file_ids: Vec<Uuid>,
    pub submission_id: Uuid,
    pub user_id: Uuid,
    /// Opaque client-side context, echoed through untouched.
    #[serde(default)]
    pub stage_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub submission_id: Uuid,
    pub user_id: Uuid,
    /// Comma-separated document ids.
    #[serde(default)]
    pub file_ids: Option<String>,
}

async fn resolve_params(
    state: &AppState,
    submission_id: Uuid,
    user_id: Uuid,
    file_ids: Vec<Uuid>,
) -> Result<SnapshotParams, AppError> {
    let submission = state
        .submission_repository
        .get_by_id(submission_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;

    Ok(SnapshotParams {
        tenant_id: submission.tenant_id,
        submission_id,
        actor_id: user_id,
        file_ids,
    })
}

/// One point-in-time status snapshot.
#[tracing::instrument(skip(state, request), fields(submission_id = %request.submission_id))]
pub async fn query_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let params = resolve_params(
        &state,
        request.submission_id,
        request.user_id,
        request.file_ids,
    )
    .await?;

    let snapshot = state.broadcaster.build_snapshot(&params).await?;
    Ok(Json(snapshot))
}

/// Long-lived status stream (text/event-stream).
///
/// The first event reports the negotiated maximum session duration so the
/// client can pre-emptively reconnect; snapshots follow on a fixed tick; a
/// terminal `stream_end` event precedes close. The duration cap is a hard
/// bound, not an optimization.
#[tracing::instrument(skip(state, query), fields(submission_id = %query.submission_id))]
pub async fn stream_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpAppError> {
    let file_ids = query
        .file_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<Uuid>()
                .map_err(|e| AppError::InvalidInput(format!("Invalid file id '{}': {}", s, e)))
        })
        .collect::<Result<Vec<Uuid>, AppError>>()?;

    let params = resolve_params(&state, query.submission_id, query.user_id, file_ids).await?;

    let budget = negotiate_duration(state.config.host_execution_limit_secs);
    let tick = Duration::from_secs(state.config.stream_tick_seconds);

    let events = state
        .broadcaster
        .clone()
        .stream(params, budget, tick)
        .map(|event| {
            let sse = match serde_json::to_string(&event) {
                Ok(data) => Event::default().event(event.name()).data(data),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize stream event");
                    Event::default().event("stream_error").data("{}")
                }
            };
            Ok(sse)
        });

    Ok(Sse::new(events))
}
