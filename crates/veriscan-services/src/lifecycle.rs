//! Per-document lifecycle state machine.
//!
//! Transitions run against persisted state and the remote similarity API.
//! Every guard is written so that duplicate or out-of-order triggers (local
//! action racing a callback, a callback delivered twice) re-apply safely
//! without duplicating side effects.

use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

use veriscan_client::RemoteScanApi;
use veriscan_core::models::{
    Document, DocumentStatus, RemoteSubmissionStatus, SimilarityPayload,
};
use veriscan_core::{confirmation_required, AppError};
use veriscan_db::{ActorStore, DocumentStore, SubmissionStore, TenantStore};

/// Follow-up action resumed after the user confirms the EULA. Closed set,
/// dispatched exhaustively.
#[derive(Debug)]
pub enum PostConfirmAction {
    Submit {
        actor_id: Uuid,
        filename: String,
        content: Bytes,
    },
    Schedule,
    Refresh,
}

/// Outcome of applying a remote acceptance status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptanceOutcome {
    /// Ingestion confirmed; the document moved to `Accepted`.
    Accepted,
    /// The document had already been accepted; duplicate trigger, no-op.
    AlreadyAccepted,
    /// The remote service is still working; document unchanged.
    Pending(RemoteSubmissionStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    /// The scheduling flag was already claimed; duplicate trigger, no-op.
    AlreadyScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityOutcome {
    Applied,
    /// The payload was not complete; presumed premature and ignored. It will
    /// be re-delivered or re-polled later.
    Ignored,
    /// Remote poll failed and errors are suppressed; nothing changed.
    Unavailable,
}

pub struct LifecycleService {
    documents: Arc<dyn DocumentStore>,
    submissions: Arc<dyn SubmissionStore>,
    actors: Arc<dyn ActorStore>,
    tenants: Arc<dyn TenantStore>,
    remote: Arc<dyn RemoteScanApi>,
    suppress_remote_errors: bool,
}

impl LifecycleService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        submissions: Arc<dyn SubmissionStore>,
        actors: Arc<dyn ActorStore>,
        tenants: Arc<dyn TenantStore>,
        remote: Arc<dyn RemoteScanApi>,
        suppress_remote_errors: bool,
    ) -> Self {
        Self {
            documents,
            submissions,
            actors,
            tenants,
            remote,
            suppress_remote_errors,
        }
    }

    async fn load_document(&self, document_id: Uuid) -> Result<Document, AppError> {
        self.documents
            .get_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))
    }

    /// Submit a document to the remote service: create the remote submission
    /// and upload the content. Valid only from `Unsubmitted`; gated on EULA
    /// confirmation. On remote failure the document returns to `Unsubmitted`
    /// so the action can be retried.
    #[tracing::instrument(skip(self, content), fields(document_id = %document_id))]
    pub async fn submit(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
        filename: &str,
        content: Bytes,
    ) -> Result<(), AppError> {
        let document = self.load_document(document_id).await?;
        if !document.status.can_submit() {
            return Err(AppError::InvalidTransition(format!(
                "Cannot submit document in state {}",
                document.status
            )));
        }

        let submission = self
            .submissions
            .get_by_id(document.submission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission {} not found", document.submission_id))
            })?;
        let tenant = self
            .tenants
            .get_by_id(submission.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Tenant {} not found", submission.tenant_id))
            })?;
        if !tenant.enabled {
            return Err(AppError::Configuration(format!(
                "Integration is disabled for tenant {}",
                tenant.name
            )));
        }
        let actor = self
            .actors
            .get_by_id(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Actor {} not found", actor_id)))?;

        if confirmation_required(&tenant, &submission, &actor) {
            return Err(AppError::EulaRequired(
                "The current EULA version must be accepted before submitting".to_string(),
            ));
        }

        self.documents
            .set_status(document_id, DocumentStatus::Uploading)
            .await?;

        let upload = async {
            let external_id = self
                .remote
                .create_submission(&actor.external_ref, filename)
                .await?;
            self.remote
                .upload_file(&external_id, filename, content)
                .await?;
            Ok::<String, AppError>(external_id)
        };

        match upload.await {
            Ok(external_id) => {
                self.documents
                    .record_upload(document_id, &external_id)
                    .await?;
                tracing::info!(document_id = %document_id, external_id = %external_id, "Document uploaded, awaiting acceptance");
                Ok(())
            }
            Err(e) => {
                // Roll back to the retryable state before surfacing the error.
                self.documents
                    .set_status(document_id, DocumentStatus::Unsubmitted)
                    .await?;
                tracing::warn!(document_id = %document_id, error = %e, "Upload failed, document reset for retry");
                Err(e)
            }
        }
    }

    /// Apply a remote acceptance status to a document. Used by both the
    /// webhook path (status comes from the payload) and the polling fallback.
    ///
    /// `COMPLETE` stamps `accepted_at` (once) and moves to `Accepted`.
    /// `CREATED`/`PROCESSING` leave the document unchanged. `ERROR` is a
    /// terminal failure for this submission attempt, surfaced distinctly from
    /// a transient one.
    #[tracing::instrument(skip(self), fields(document_id = %document_id))]
    pub async fn apply_acceptance_status(
        &self,
        document_id: Uuid,
        status: RemoteSubmissionStatus,
        error_code: Option<&str>,
    ) -> Result<AcceptanceOutcome, AppError> {
        let document = self.load_document(document_id).await?;

        if !document.status.can_confirm_acceptance() {
            // A duplicate SUBMISSION_COMPLETE after the document moved on is
            // expected under at-least-once delivery; re-applying is a no-op.
            if document.accepted_at.is_some() {
                return Ok(AcceptanceOutcome::AlreadyAccepted);
            }
            return Err(AppError::InvalidTransition(format!(
                "Cannot confirm acceptance in state {}",
                document.status
            )));
        }

        match status {
            RemoteSubmissionStatus::Complete => {
                self.documents.record_acceptance(document_id).await?;
                tracing::info!(document_id = %document_id, "Remote ingestion accepted");
                Ok(AcceptanceOutcome::Accepted)
            }
            RemoteSubmissionStatus::Created | RemoteSubmissionStatus::Processing => {
                Ok(AcceptanceOutcome::Pending(status))
            }
            RemoteSubmissionStatus::Error => Err(AppError::RemoteTerminal(format!(
                "The similarity service could not process this submission ({})",
                error_code.unwrap_or("unknown error")
            ))),
        }
    }

    /// Polling fallback for when no acceptance callback has arrived: query
    /// the remote submission status synchronously and apply it.
    #[tracing::instrument(skip(self), fields(document_id = %document_id))]
    pub async fn confirm_acceptance(
        &self,
        document_id: Uuid,
    ) -> Result<AcceptanceOutcome, AppError> {
        let document = self.load_document(document_id).await?;
        let external_id = document.external_id.as_deref().ok_or_else(|| {
            AppError::InvalidTransition(
                "Document has no remote submission to confirm".to_string(),
            )
        })?;

        let info = self.remote.get_submission_info(external_id).await?;
        self.apply_acceptance_status(document_id, info.status, info.error_code.as_deref())
            .await
    }

    /// Request similarity generation. Valid only from `Accepted`. The
    /// scheduling flag is claimed atomically before the remote call, so a
    /// concurrent duplicate trigger sees `AlreadyScheduled` and makes no
    /// second remote request; a failed remote call releases the claim.
    #[tracing::instrument(skip(self), fields(document_id = %document_id))]
    pub async fn schedule_similarity(
        &self,
        document_id: Uuid,
    ) -> Result<ScheduleOutcome, AppError> {
        let document = self.load_document(document_id).await?;
        if document.similarity_scheduled {
            return Ok(ScheduleOutcome::AlreadyScheduled);
        }
        if !document.status.can_schedule_similarity() {
            return Err(AppError::InvalidTransition(format!(
                "Cannot schedule similarity in state {}",
                document.status
            )));
        }
        let external_id = document.external_id.as_deref().ok_or_else(|| {
            AppError::InvalidTransition("Document has no remote submission".to_string())
        })?;

        let submission = self
            .submissions
            .get_by_id(document.submission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission {} not found", document.submission_id))
            })?;
        let tenant = self
            .tenants
            .get_by_id(submission.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Tenant {} not found", submission.tenant_id))
            })?;

        if !self
            .documents
            .try_mark_similarity_scheduled(document_id)
            .await?
        {
            return Ok(ScheduleOutcome::AlreadyScheduled);
        }

        match self
            .remote
            .schedule_similarity(external_id, &tenant.similarity_settings)
            .await
        {
            Ok(()) => {
                self.documents
                    .set_status(document_id, DocumentStatus::SimilarityPending)
                    .await?;
                tracing::info!(document_id = %document_id, "Similarity check scheduled");
                Ok(ScheduleOutcome::Scheduled)
            }
            Err(e) => {
                self.documents.release_similarity_claim(document_id).await?;
                tracing::warn!(document_id = %document_id, error = %e, "Scheduling failed, claim released for retry");
                Err(e)
            }
        }
    }

    /// Apply a similarity result. Valid from `SimilarityPending` and
    /// re-entrantly from `SimilarityAvailable` (update events carry fresh
    /// data). Non-complete payloads are ignored without mutation.
    #[tracing::instrument(skip(self, payload), fields(document_id = %document_id))]
    pub async fn apply_similarity_result(
        &self,
        document_id: Uuid,
        payload: SimilarityPayload,
    ) -> Result<SimilarityOutcome, AppError> {
        let document = self.load_document(document_id).await?;
        if !document.status.can_apply_similarity() {
            return Err(AppError::InvalidTransition(format!(
                "Cannot apply similarity result in state {}",
                document.status
            )));
        }

        let report = payload.into_report();
        if !report.is_complete() {
            tracing::debug!(document_id = %document_id, status = %report.status, "Ignoring premature similarity result");
            return Ok(SimilarityOutcome::Ignored);
        }

        self.documents.store_report(document_id, &report).await?;
        tracing::info!(document_id = %document_id, score = report.overall_score, "Similarity result stored");

        // The submission is complete once every document has a report.
        let siblings = self
            .documents
            .list_by_submission(document.submission_id)
            .await?;
        if siblings.iter().all(|d| d.similarity_report.is_some()) {
            self.submissions
                .mark_completed(document.submission_id)
                .await?;
        }

        Ok(SimilarityOutcome::Applied)
    }

    /// Poll the remote service for the current similarity result without
    /// waiting for a callback, applying it through the same guard.
    #[tracing::instrument(skip(self), fields(document_id = %document_id))]
    pub async fn refresh(&self, document_id: Uuid) -> Result<SimilarityOutcome, AppError> {
        let document = self.load_document(document_id).await?;
        if !document.status.can_apply_similarity() {
            return Err(AppError::InvalidTransition(format!(
                "Cannot refresh similarity in state {}",
                document.status
            )));
        }
        let external_id = document.external_id.as_deref().ok_or_else(|| {
            AppError::InvalidTransition("Document has no remote submission".to_string())
        })?;

        let payload = match self.remote.get_similarity_result(external_id).await {
            Ok(payload) => payload,
            Err(e) if self.suppress_remote_errors => {
                tracing::warn!(document_id = %document_id, error = %e, "Similarity poll failed, suppressed");
                return Ok(SimilarityOutcome::Unavailable);
            }
            Err(e) => return Err(e),
        };

        self.apply_similarity_result(document_id, payload).await
    }

    /// Mint a per-actor viewer URL for an available report and persist it.
    #[tracing::instrument(skip(self), fields(document_id = %document_id))]
    pub async fn viewer_url(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
    ) -> Result<String, AppError> {
        let document = self.load_document(document_id).await?;
        if document.similarity_report.is_none() {
            return Err(AppError::InvalidTransition(
                "No similarity report is available yet".to_string(),
            ));
        }
        let external_id = document.external_id.as_deref().ok_or_else(|| {
            AppError::InvalidTransition("Document has no remote submission".to_string())
        })?;
        let actor = self
            .actors
            .get_by_id(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Actor {} not found", actor_id)))?;

        let url = self
            .remote
            .create_viewer_url(external_id, &actor.external_ref)
            .await?;
        self.documents.set_viewer_url(document_id, &url).await?;
        Ok(url)
    }

    /// Resume the action a user was blocked from by the EULA gate, after
    /// confirmation. The closed enum keeps dispatch exhaustive.
    #[tracing::instrument(skip(self, action), fields(document_id = %document_id))]
    pub async fn resume_after_confirmation(
        &self,
        document_id: Uuid,
        action: PostConfirmAction,
    ) -> Result<(), AppError> {
        match action {
            PostConfirmAction::Submit {
                actor_id,
                filename,
                content,
            } => self.submit(document_id, actor_id, &filename, content).await,
            PostConfirmAction::Schedule => {
                self.schedule_similarity(document_id).await.map(|_| ())
            }
            PostConfirmAction::Refresh => self.refresh(document_id).await.map(|_| ()),
        }
    }
}
