//! Status broadcaster: point-in-time snapshots and bounded streaming.
//!
//! Both access modes share one snapshot builder. The streaming mode
//! negotiates a hard session bound up front and tells the client about it in
//! the first event, so clients reconnect pre-emptively instead of discovering
//! a dead connection. Between ticks the stream holds nothing but its own
//! state; every tick re-reads persisted records.

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use veriscan_core::constants::{MAX_STREAM_DURATION_SECS, STREAM_SAFETY_MARGIN_SECS};
use veriscan_core::models::DocumentStatus;
use veriscan_core::{confirmation_required, AppError};
use veriscan_db::{ActorStore, DocumentStore, SubmissionStore, TenantStore};

/// Negotiated bound for one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBudget {
    pub max_duration_secs: u64,
    /// True when the host execution limit forced a shorter session than the
    /// default ceiling.
    pub clamped_by_host: bool,
}

/// Compute the session bound: the 600 s ceiling, further capped by the host
/// execution limit when that limit is non-zero and lower, minus a 5 s safety
/// margin. The bound is a hard requirement, not an optimization.
pub fn negotiate_duration(host_execution_limit_secs: u64) -> StreamBudget {
    let mut cap = MAX_STREAM_DURATION_SECS;
    let mut clamped = false;
    if host_execution_limit_secs > 0 && host_execution_limit_secs < cap {
        cap = host_execution_limit_secs;
        clamped = true;
    }
    StreamBudget {
        max_duration_secs: cap.saturating_sub(STREAM_SAFETY_MARGIN_SECS).max(1),
        clamped_by_host: clamped,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStatus {
    pub eula_required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatusView {
    pub id: Uuid,
    pub eula_version: Option<String>,
    pub eula_accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorStatusView {
    pub id: Uuid,
    pub eula_version: Option<String>,
    pub eula_confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatusView {
    pub id: Uuid,
    pub status: DocumentStatus,
    pub external_id: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub similarity_scheduled: bool,
    pub overall_score: Option<i32>,
    pub report_status: Option<String>,
    pub viewer_url: Option<String>,
}

/// One full client-facing status snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub context: ContextStatus,
    pub submission: SubmissionStatusView,
    pub user: ActorStatusView,
    pub files: HashMap<Uuid, DocumentStatusView>,
}

/// Parameters identifying what a snapshot covers.
#[derive(Debug, Clone)]
pub struct SnapshotParams {
    pub tenant_id: Uuid,
    pub submission_id: Uuid,
    pub actor_id: Uuid,
    pub file_ids: Vec<Uuid>,
}

/// Events emitted on a streaming session, in order: one `Start`, any number
/// of `Snapshot`s, one `End`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        max_duration: u64,
        ini_set_failed: bool,
    },
    Snapshot(Box<StatusSnapshot>),
    End {},
}

impl StreamEvent {
    /// SSE event name for this payload.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Start { .. } => "stream_start",
            StreamEvent::Snapshot(_) => "status",
            StreamEvent::End {} => "stream_end",
        }
    }
}

pub struct StatusBroadcaster {
    tenants: Arc<dyn TenantStore>,
    submissions: Arc<dyn SubmissionStore>,
    actors: Arc<dyn ActorStore>,
    documents: Arc<dyn DocumentStore>,
}

impl StatusBroadcaster {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        submissions: Arc<dyn SubmissionStore>,
        actors: Arc<dyn ActorStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            tenants,
            submissions,
            actors,
            documents,
        }
    }

    /// Build one point-in-time snapshot from persisted state.
    #[tracing::instrument(skip(self, params), fields(submission_id = %params.submission_id))]
    pub async fn build_snapshot(&self, params: &SnapshotParams) -> Result<StatusSnapshot, AppError> {
        let tenant = self
            .tenants
            .get_by_id(params.tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", params.tenant_id)))?;
        let submission = self
            .submissions
            .get_by_id(params.submission_id)
            .await?
            .filter(|s| s.tenant_id == params.tenant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission {} not found", params.submission_id))
            })?;
        let actor = self
            .actors
            .get_by_id(params.actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Actor {} not found", params.actor_id)))?;

        let mut files = HashMap::with_capacity(params.file_ids.len());
        for file_id in &params.file_ids {
            let Some(document) = self.documents.get_by_id(*file_id).await? else {
                continue;
            };
            if document.submission_id != submission.id {
                continue;
            }
            let (overall_score, report_status, viewer_url) = match &document.similarity_report {
                Some(report) => (
                    Some(report.overall_score),
                    Some(report.status.clone()),
                    report.viewer_url.clone(),
                ),
                None => (None, None, None),
            };
            files.insert(
                document.id,
                DocumentStatusView {
                    id: document.id,
                    status: document.status,
                    external_id: document.external_id.clone(),
                    accepted_at: document.accepted_at,
                    similarity_scheduled: document.similarity_scheduled,
                    overall_score,
                    report_status,
                    viewer_url,
                },
            );
        }

        Ok(StatusSnapshot {
            context: ContextStatus {
                eula_required: confirmation_required(&tenant, &submission, &actor),
            },
            submission: SubmissionStatusView {
                id: submission.id,
                eula_version: submission.eula_version,
                eula_accepted_at: submission.eula_accepted_at,
                completed_at: submission.completed_at,
            },
            user: ActorStatusView {
                id: actor.id,
                eula_version: actor.eula_version,
                eula_confirmed_at: actor.eula_accepted_at,
            },
            files,
        })
    }

    /// Open a bounded streaming session. Yields `Start` immediately, then a
    /// fresh snapshot every `tick` until `max_duration` elapses, then `End`.
    /// Cancellation is tied to the consumer: dropping the stream (client
    /// disconnect) stops all work.
    pub fn stream(
        self: Arc<Self>,
        params: SnapshotParams,
        budget: StreamBudget,
        tick: Duration,
    ) -> impl Stream<Item = StreamEvent> + Send {
        self.stream_with_durations(
            params,
            Duration::from_secs(budget.max_duration_secs),
            tick,
            budget.clamped_by_host,
        )
    }

    /// Duration-typed variant; split out so tests can run millisecond ticks.
    pub fn stream_with_durations(
        self: Arc<Self>,
        params: SnapshotParams,
        max_duration: Duration,
        tick: Duration,
        clamped_by_host: bool,
    ) -> impl Stream<Item = StreamEvent> + Send {
        enum Phase {
            Start,
            Ticking,
            Done,
        }

        struct State {
            broadcaster: Arc<StatusBroadcaster>,
            params: SnapshotParams,
            deadline: Instant,
            tick: Duration,
            phase: Phase,
        }

        let state = State {
            broadcaster: self,
            params,
            deadline: Instant::now() + max_duration,
            tick,
            phase: Phase::Start,
        };
        let max_duration_secs = max_duration.as_secs();

        stream::unfold(state, move |mut state| async move {
            loop {
                match state.phase {
                    Phase::Start => {
                        state.phase = Phase::Ticking;
                        return Some((
                            StreamEvent::Start {
                                max_duration: max_duration_secs,
                                ini_set_failed: clamped_by_host,
                            },
                            state,
                        ));
                    }
                    Phase::Ticking => {
                        let next_tick = Instant::now() + state.tick;
                        if next_tick >= state.deadline {
                            state.phase = Phase::Done;
                            return Some((StreamEvent::End {}, state));
                        }
                        tokio::time::sleep_until(next_tick).await;
                        match state.broadcaster.build_snapshot(&state.params).await {
                            Ok(snapshot) => {
                                return Some((StreamEvent::Snapshot(Box::new(snapshot)), state));
                            }
                            Err(e) => {
                                // Skip this tick; the next one re-reads state.
                                tracing::warn!(error = %e, "Snapshot build failed mid-stream");
                            }
                        }
                    }
                    Phase::Done => return None,
                }
            }
        })
    }
}
