//! Inbound callback endpoint.
//!
//! The remote service (or the simulator standing in for it) POSTs signed
//! event notifications here. The response is always 200: rejection detail
//! goes to the log, never back to the sender, so a misconfigured client
//! cannot amplify into a retry storm.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use veriscan_services::gateway::{EVENT_TYPE_HEADER, SIGNATURE_HEADER};

use crate::state::AppState;

/// Receive one callback for a tenant. Side-effecting only; the body of the
/// response carries nothing the sender should act on.
#[tracing::instrument(skip(state, headers, body), fields(tenant_id = %tenant_id))]
pub async fn receive_callback(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event_type = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok());
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state
        .gateway
        .handle(tenant_id, event_type, signature, &body)
        .await;

    StatusCode::OK
}
