//! Webhook ingestion gateway.
//!
//! Authenticates inbound callbacks and translates them into lifecycle
//! transitions. Every rejection is non-fatal: the outcome is logged with
//! enough context to diagnose a misconfiguration, and the HTTP layer always
//! acknowledges the sender with 200 so a misconfigured client cannot turn
//! into a retry storm.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use veriscan_core::models::{
    CallbackEventType, CallbackRef, SimilarityPayload, SubmissionCompletePayload,
};
use veriscan_core::AppError;
use veriscan_db::{DocumentStore, SubmissionStore, TenantStore};

use crate::lifecycle::{AcceptanceOutcome, LifecycleService};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback event type.
pub const EVENT_TYPE_HEADER: &str = "X-Veriscan-EventType";
/// Header carrying the HMAC-SHA256 hex signature of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Veriscan-Signature";

/// Sign a callback body with a tenant secret. Shared by the gateway's
/// verification and the simulator's synthesis so both sides of the contract
/// use one implementation.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length; new_from_slice only fails for
    // block-size issues that cannot occur with SHA-256.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn signature_matches(secret: &str, body: &[u8], provided_hex: &str) -> bool {
    let expected = sign_body(secret, body);
    // Compare the hex strings in constant time; decoding the caller's input
    // first would leak a length/format timing signal.
    expected.as_bytes().ct_eq(provided_hex.as_bytes()).into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Tenant has neither a webhook id nor a signing secret.
    Unconfigured,
    MissingHeaders,
    UnknownEventType(String),
    InvalidSignature,
    MalformedPayload(String),
    /// The external submission id did not resolve to any document.
    UnknownSubmission(String),
    /// Resolved, but the document belongs to a different tenant.
    TenantMismatch,
    /// Storage or downstream failure while applying the event.
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// The event was authenticated and applied (or re-applied as a no-op).
    Applied(CallbackEventType),
    /// Recognized event type with no state transition (forward-compatible).
    AcknowledgedNoOp(CallbackEventType),
    /// Dropped; reason logged, sender still acknowledged.
    Rejected(RejectReason),
}

pub struct WebhookGateway {
    tenants: Arc<dyn TenantStore>,
    submissions: Arc<dyn SubmissionStore>,
    documents: Arc<dyn DocumentStore>,
    lifecycle: Arc<LifecycleService>,
}

impl WebhookGateway {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        submissions: Arc<dyn SubmissionStore>,
        documents: Arc<dyn DocumentStore>,
        lifecycle: Arc<LifecycleService>,
    ) -> Self {
        Self {
            tenants,
            submissions,
            documents,
            lifecycle,
        }
    }

    /// Authenticate and apply one inbound callback. Side-effecting only:
    /// never returns an error, because the sender gets a success
    /// acknowledgement regardless.
    #[tracing::instrument(skip(self, signature, body), fields(tenant_id = %tenant_id))]
    pub async fn handle(
        &self,
        tenant_id: Uuid,
        event_type: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> GatewayOutcome {
        let outcome = self
            .handle_inner(tenant_id, event_type, signature, body)
            .await;

        match &outcome {
            GatewayOutcome::Applied(event) => {
                tracing::info!(tenant_id = %tenant_id, event = %event, "Callback applied");
            }
            GatewayOutcome::AcknowledgedNoOp(event) => {
                tracing::info!(tenant_id = %tenant_id, event = %event, "Callback acknowledged without transition");
            }
            GatewayOutcome::Rejected(reason) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    event_type = event_type.unwrap_or("<missing>"),
                    reason = ?reason,
                    "Callback dropped"
                );
            }
        }

        outcome
    }

    async fn handle_inner(
        &self,
        tenant_id: Uuid,
        event_type: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> GatewayOutcome {
        let tenant = match self.tenants.get_by_id(tenant_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => return GatewayOutcome::Rejected(RejectReason::Unconfigured),
            Err(e) => return GatewayOutcome::Rejected(RejectReason::Internal(e.to_string())),
        };

        if !tenant.webhook_configured() {
            return GatewayOutcome::Rejected(RejectReason::Unconfigured);
        }

        let (event_type, signature) = match (event_type, signature) {
            (Some(event_type), Some(signature)) => (event_type, signature),
            _ => return GatewayOutcome::Rejected(RejectReason::MissingHeaders),
        };

        let event: CallbackEventType = match event_type.parse() {
            Ok(event) => event,
            Err(_) => {
                return GatewayOutcome::Rejected(RejectReason::UnknownEventType(
                    event_type.to_string(),
                ))
            }
        };

        // webhook_configured() above guarantees the secret exists.
        let Some(secret) = tenant.webhook_signing_secret.as_deref() else {
            return GatewayOutcome::Rejected(RejectReason::Unconfigured);
        };
        if !signature_matches(secret, body, signature) {
            return GatewayOutcome::Rejected(RejectReason::InvalidSignature);
        }

        let callback_ref: CallbackRef = match serde_json::from_slice(body) {
            Ok(r) => r,
            Err(e) => return GatewayOutcome::Rejected(RejectReason::MalformedPayload(e.to_string())),
        };

        let document = match self.documents.get_by_external_id(&callback_ref.id).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                return GatewayOutcome::Rejected(RejectReason::UnknownSubmission(callback_ref.id))
            }
            Err(e) => return GatewayOutcome::Rejected(RejectReason::Internal(e.to_string())),
        };

        // The external id may reference a sibling tenant's document; the
        // resolved document must belong to the inbound tenant.
        match self.submissions.get_by_id(document.submission_id).await {
            Ok(Some(submission)) if submission.tenant_id == tenant.id => {}
            Ok(Some(_)) => return GatewayOutcome::Rejected(RejectReason::TenantMismatch),
            Ok(None) => {
                return GatewayOutcome::Rejected(RejectReason::Internal(format!(
                    "Submission {} missing for document {}",
                    document.submission_id, document.id
                )))
            }
            Err(e) => return GatewayOutcome::Rejected(RejectReason::Internal(e.to_string())),
        }

        match event {
            CallbackEventType::SubmissionComplete => {
                self.apply_submission_complete(document.id, event, body).await
            }
            CallbackEventType::SimilarityComplete | CallbackEventType::SimilarityUpdated => {
                self.apply_similarity(document.id, event, body).await
            }
            CallbackEventType::PdfStatus | CallbackEventType::GroupAttachmentComplete => {
                GatewayOutcome::AcknowledgedNoOp(event)
            }
        }
    }

    /// One SUBMISSION_COMPLETE event collapses two remote round trips:
    /// confirm the acceptance, then schedule similarity unless some other
    /// path already claimed it.
    async fn apply_submission_complete(
        &self,
        document_id: Uuid,
        event: CallbackEventType,
        body: &[u8],
    ) -> GatewayOutcome {
        let payload: SubmissionCompletePayload = match serde_json::from_slice(body) {
            Ok(p) => p,
            Err(e) => return GatewayOutcome::Rejected(RejectReason::MalformedPayload(e.to_string())),
        };

        let outcome = match self
            .lifecycle
            .apply_acceptance_status(document_id, payload.status, payload.error_code.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(AppError::RemoteTerminal(msg)) => {
                // Terminal for this submission attempt; recorded for the user
                // to see on next status read, nothing for the sender to retry.
                tracing::warn!(document_id = %document_id, error = %msg, "Submission terminally failed at remote");
                return GatewayOutcome::Applied(event);
            }
            Err(e) => return GatewayOutcome::Rejected(RejectReason::Internal(e.to_string())),
        };

        if matches!(
            outcome,
            AcceptanceOutcome::Accepted | AcceptanceOutcome::AlreadyAccepted
        ) {
            if let Err(e) = self.lifecycle.schedule_similarity(document_id).await {
                tracing::warn!(document_id = %document_id, error = %e, "Post-acceptance scheduling failed, will retry on next trigger");
            }
        }

        GatewayOutcome::Applied(event)
    }

    async fn apply_similarity(
        &self,
        document_id: Uuid,
        event: CallbackEventType,
        body: &[u8],
    ) -> GatewayOutcome {
        let payload: SimilarityPayload = match serde_json::from_slice(body) {
            Ok(p) => p,
            Err(e) => return GatewayOutcome::Rejected(RejectReason::MalformedPayload(e.to_string())),
        };

        match self
            .lifecycle
            .apply_similarity_result(document_id, payload)
            .await
        {
            Ok(_) => GatewayOutcome::Applied(event),
            Err(e) => GatewayOutcome::Rejected(RejectReason::Internal(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MemoryStores, RecordingScanApi};
    use veriscan_client::RemoteScanApi;
    use veriscan_core::models::DocumentStatus;

    const SECRET: &str = "top-secret";

    fn gateway(stores: &MemoryStores, remote: &Arc<RecordingScanApi>) -> WebhookGateway {
        let lifecycle = Arc::new(LifecycleService::new(
            stores.documents(),
            stores.submissions(),
            stores.actors(),
            stores.tenants(),
            remote.clone() as Arc<dyn RemoteScanApi>,
            false,
        ));
        WebhookGateway::new(
            stores.tenants(),
            stores.submissions(),
            stores.documents(),
            lifecycle,
        )
    }

    fn signed(body: &serde_json::Value) -> (Vec<u8>, String) {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = sign_body(SECRET, &bytes);
        (bytes, signature)
    }

    #[test]
    fn test_sign_body_is_deterministic_hex() {
        let a = sign_body(SECRET, b"payload");
        let b = sign_body(SECRET, b"payload");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_body("other-secret", b"payload"));
    }

    #[tokio::test]
    async fn test_unconfigured_tenant_is_dropped() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let mut tenant = fixtures::tenant(false);
        tenant.webhook_id = None;
        tenant.webhook_signing_secret = None;
        let tenant = stores.insert_tenant(tenant);

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({"id": "ext-1", "status": "COMPLETE"}));
        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::Unconfigured)
        );
    }

    #[tokio::test]
    async fn test_missing_headers_are_dropped() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));

        let gw = gateway(&stores, &remote);
        let outcome = gw.handle(tenant.id, None, Some("sig"), b"{}").await;
        assert_eq!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::MissingHeaders)
        );
        let outcome = gw
            .handle(tenant.id, Some("SUBMISSION_COMPLETE"), None, b"{}")
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::MissingHeaders)
        );
    }

    #[tokio::test]
    async fn test_invalid_signature_is_dropped() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        stores.insert_document(fixtures::document_with_external(
            submission.id,
            DocumentStatus::AwaitingAcceptance,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let body = serde_json::to_vec(&serde_json::json!({"id": "ext-1", "status": "COMPLETE"}))
            .unwrap();
        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_COMPLETE"),
                Some("deadbeef"),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_unknown_submission_acknowledged_without_mutation() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let document = stores.insert_document(fixtures::document_with_external(
            submission.id,
            DocumentStatus::AwaitingAcceptance,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) =
            signed(&serde_json::json!({"id": "ext-does-not-exist", "status": "COMPLETE"}));
        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert!(matches!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::UnknownSubmission(_))
        ));
        // Nothing changed for the document we do know about.
        assert_eq!(
            stores.document(document.id).status,
            DocumentStatus::AwaitingAcceptance
        );
    }

    #[tokio::test]
    async fn test_cross_tenant_submission_is_dropped() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant_a = stores.insert_tenant(fixtures::tenant(false));
        let mut other = fixtures::tenant(false);
        other.name = "other".to_string();
        let tenant_b = stores.insert_tenant(other);
        // Document belongs to tenant B; callback arrives addressed to tenant A.
        let submission_b = stores.insert_submission(fixtures::submission(tenant_b.id));
        let document = stores.insert_document(fixtures::document_with_external(
            submission_b.id,
            DocumentStatus::AwaitingAcceptance,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({"id": "ext-1", "status": "COMPLETE"}));
        let outcome = gw
            .handle(
                tenant_a.id,
                Some("SUBMISSION_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::TenantMismatch)
        );
        assert_eq!(
            stores.document(document.id).status,
            DocumentStatus::AwaitingAcceptance
        );
    }

    #[tokio::test]
    async fn test_submission_complete_confirms_and_schedules_once() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let document = stores.insert_document(fixtures::document_with_external(
            submission.id,
            DocumentStatus::AwaitingAcceptance,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({"id": "ext-1", "status": "COMPLETE"}));

        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Applied(CallbackEventType::SubmissionComplete)
        );
        assert_eq!(
            stores.document(document.id).status,
            DocumentStatus::SimilarityPending
        );

        // Duplicate delivery: still acknowledged, still exactly one remote
        // scheduling call.
        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Applied(CallbackEventType::SubmissionComplete)
        );
        assert_eq!(remote.schedule_calls(), 1);
    }

    #[tokio::test]
    async fn test_similarity_complete_applies_result() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let document = stores.insert_document(fixtures::scheduled_document(
            submission.id,
            DocumentStatus::SimilarityPending,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({
            "submission_id": "ext-1",
            "status": "COMPLETE",
            "overall_match_percentage": 61
        }));
        let outcome = gw
            .handle(
                tenant.id,
                Some("SIMILARITY_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Applied(CallbackEventType::SimilarityComplete)
        );
        let doc = stores.document(document.id);
        assert_eq!(doc.status, DocumentStatus::SimilarityAvailable);
        assert_eq!(doc.similarity_report.unwrap().overall_score, 61);
    }

    #[tokio::test]
    async fn test_incomplete_similarity_callback_is_a_no_op() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let document = stores.insert_document(fixtures::scheduled_document(
            submission.id,
            DocumentStatus::SimilarityPending,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({
            "submission_id": "ext-1",
            "status": "PROCESSING"
        }));
        let outcome = gw
            .handle(
                tenant.id,
                Some("SIMILARITY_COMPLETE"),
                Some(&signature),
                &body,
            )
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::Applied(CallbackEventType::SimilarityComplete)
        );
        assert!(stores.document(document.id).similarity_report.is_none());
    }

    #[tokio::test]
    async fn test_listed_but_inert_event_types_are_acknowledged() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let document = stores.insert_document(fixtures::document_with_external(
            submission.id,
            DocumentStatus::AwaitingAcceptance,
            "ext-1",
        ));

        let gw = gateway(&stores, &remote);
        let (body, signature) = signed(&serde_json::json!({"id": "ext-1", "status": "COMPLETE"}));
        let outcome = gw
            .handle(tenant.id, Some("PDF_STATUS"), Some(&signature), &body)
            .await;
        assert_eq!(
            outcome,
            GatewayOutcome::AcknowledgedNoOp(CallbackEventType::PdfStatus)
        );
        assert_eq!(
            stores.document(document.id).status,
            DocumentStatus::AwaitingAcceptance
        );

        let outcome = gw
            .handle(
                tenant.id,
                Some("SUBMISSION_DELETED"),
                Some(&signature),
                &body,
            )
            .await;
        assert!(matches!(
            outcome,
            GatewayOutcome::Rejected(RejectReason::UnknownEventType(_))
        ));
    }
}
