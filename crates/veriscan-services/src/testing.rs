//! In-memory stores and a call-recording remote API fake for service tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use veriscan_client::{EulaVersionInfo, RemoteScanApi, SubmissionInfo};
use veriscan_core::models::{
    Actor, Document, DocumentStatus, RemoteSubmissionStatus, SimilarityPayload, SimilarityReport,
    SimilaritySettings, Submission, Tenant,
};
use veriscan_core::AppError;
use veriscan_db::{ActorStore, DocumentStore, SubmissionStore, TenantStore};

#[derive(Default)]
struct Inner {
    documents: Mutex<HashMap<Uuid, Document>>,
    submissions: Mutex<HashMap<Uuid, Submission>>,
    actors: Mutex<HashMap<Uuid, Actor>>,
    tenants: Mutex<HashMap<Uuid, Tenant>>,
}

/// Shared in-memory backing for all four store traits.
#[derive(Clone, Default)]
pub struct MemoryStores {
    inner: Arc<Inner>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        Arc::new(MemDocumentStore(self.inner.clone()))
    }

    pub fn submissions(&self) -> Arc<dyn SubmissionStore> {
        Arc::new(MemSubmissionStore(self.inner.clone()))
    }

    pub fn actors(&self) -> Arc<dyn ActorStore> {
        Arc::new(MemActorStore(self.inner.clone()))
    }

    pub fn tenants(&self) -> Arc<dyn TenantStore> {
        Arc::new(MemTenantStore(self.inner.clone()))
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> Tenant {
        self.inner
            .tenants
            .lock()
            .unwrap()
            .insert(tenant.id, tenant.clone());
        tenant
    }

    pub fn insert_submission(&self, submission: Submission) -> Submission {
        self.inner
            .submissions
            .lock()
            .unwrap()
            .insert(submission.id, submission.clone());
        submission
    }

    pub fn insert_actor(&self, actor: Actor) -> Actor {
        self.inner
            .actors
            .lock()
            .unwrap()
            .insert(actor.id, actor.clone());
        actor
    }

    pub fn insert_document(&self, document: Document) -> Document {
        self.inner
            .documents
            .lock()
            .unwrap()
            .insert(document.id, document.clone());
        document
    }

    pub fn document(&self, id: Uuid) -> Document {
        self.inner.documents.lock().unwrap()[&id].clone()
    }

    pub fn submission(&self, id: Uuid) -> Submission {
        self.inner.submissions.lock().unwrap()[&id].clone()
    }

    pub fn actor(&self, id: Uuid) -> Actor {
        self.inner.actors.lock().unwrap()[&id].clone()
    }

    pub fn stamp_submission(&self, id: Uuid, version: &str) {
        let mut submissions = self.inner.submissions.lock().unwrap();
        let submission = submissions.get_mut(&id).unwrap();
        submission.eula_version = Some(version.to_string());
        submission.eula_accepted_at = Some(Utc::now());
    }

    pub fn stamp_actor(&self, id: Uuid, version: &str) {
        let mut actors = self.inner.actors.lock().unwrap();
        let actor = actors.get_mut(&id).unwrap();
        actor.eula_version = Some(version.to_string());
        actor.eula_accepted_at = Some(Utc::now());
    }
}

struct MemDocumentStore(Arc<Inner>);
struct MemSubmissionStore(Arc<Inner>);
struct MemActorStore(Arc<Inner>);
struct MemTenantStore(Arc<Inner>);

#[async_trait]
impl DocumentStore for MemDocumentStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.0.documents.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .0
            .documents
            .lock()
            .unwrap()
            .values()
            .find(|d| d.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Document>, AppError> {
        let mut documents: Vec<Document> = self
            .0
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.submission_id == submission_id)
            .cloned()
            .collect();
        documents.sort_by_key(|d| d.created_at);
        Ok(documents)
    }

    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            document.status = status;
            document.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_upload(&self, id: Uuid, external_id: &str) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            document.external_id = Some(external_id.to_string());
            document.status = DocumentStatus::AwaitingAcceptance;
            document.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_acceptance(&self, id: Uuid) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            if document.accepted_at.is_none() {
                document.accepted_at = Some(Utc::now());
            }
            document.status = DocumentStatus::Accepted;
            document.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn try_mark_similarity_scheduled(&self, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        match documents.get_mut(&id) {
            Some(document) if !document.similarity_scheduled => {
                document.similarity_scheduled = true;
                document.status = DocumentStatus::ScheduleRequested;
                document.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_similarity_claim(&self, id: Uuid) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            if document.similarity_scheduled && document.similarity_report.is_none() {
                document.similarity_scheduled = false;
                document.status = DocumentStatus::Accepted;
                document.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn store_report(&self, id: Uuid, report: &SimilarityReport) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            if document.similarity_scheduled {
                document.similarity_report = Some(report.clone());
                document.status = DocumentStatus::SimilarityAvailable;
                document.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_viewer_url(&self, id: Uuid, url: &str) -> Result<(), AppError> {
        let mut documents = self.0.documents.lock().unwrap();
        if let Some(document) = documents.get_mut(&id) {
            if let Some(report) = document.similarity_report.as_mut() {
                report.viewer_url = Some(url.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for MemSubmissionStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        Ok(self.0.submissions.lock().unwrap().get(&id).cloned())
    }

    async fn stamp_eula(&self, id: Uuid, version: &str, url: &str) -> Result<(), AppError> {
        let mut submissions = self.0.submissions.lock().unwrap();
        if let Some(submission) = submissions.get_mut(&id) {
            if submission.eula_version.is_none() {
                submission.eula_version = Some(version.to_string());
                submission.eula_url = Some(url.to_string());
                submission.eula_accepted_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), AppError> {
        let mut submissions = self.0.submissions.lock().unwrap();
        if let Some(submission) = submissions.get_mut(&id) {
            if submission.completed_at.is_none() {
                submission.completed_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ActorStore for MemActorStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Actor>, AppError> {
        Ok(self.0.actors.lock().unwrap().get(&id).cloned())
    }

    async fn stamp_eula(&self, id: Uuid, version: &str) -> Result<(), AppError> {
        let mut actors = self.0.actors.lock().unwrap();
        if let Some(actor) = actors.get_mut(&id) {
            if actor.eula_version.is_none() {
                actor.eula_version = Some(version.to_string());
                actor.eula_accepted_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for MemTenantStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(self.0.tenants.lock().unwrap().get(&id).cloned())
    }
}

/// Remote API fake: counts calls, returns canned data, and can be flipped
/// into various failure modes.
#[derive(Default)]
pub struct RecordingScanApi {
    create_submission_calls: AtomicUsize,
    schedule_calls: AtomicUsize,
    confirm_eula_calls: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_scheduling: AtomicBool,
    fail_similarity_polls: AtomicBool,
    similarity_result: Mutex<Option<SimilarityPayload>>,
    submission_status: Mutex<Option<RemoteSubmissionStatus>>,
}

impl RecordingScanApi {
    pub fn create_submission_calls(&self) -> usize {
        self.create_submission_calls.load(Ordering::SeqCst)
    }

    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    pub fn confirm_eula_calls(&self) -> usize {
        self.confirm_eula_calls.load(Ordering::SeqCst)
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_scheduling(&self) {
        self.fail_scheduling.store(true, Ordering::SeqCst);
    }

    pub fn fail_similarity_polls(&self) {
        self.fail_similarity_polls.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.fail_uploads.store(false, Ordering::SeqCst);
        self.fail_scheduling.store(false, Ordering::SeqCst);
        self.fail_similarity_polls.store(false, Ordering::SeqCst);
    }

    pub fn set_similarity_result(&self, payload: SimilarityPayload) {
        *self.similarity_result.lock().unwrap() = Some(payload);
    }

    pub fn set_submission_status(&self, status: RemoteSubmissionStatus) {
        *self.submission_status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl RemoteScanApi for RecordingScanApi {
    async fn create_submission(&self, _owner: &str, _title: &str) -> Result<String, AppError> {
        let n = self.create_submission_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ext-{}", n + 1))
    }

    async fn upload_file(
        &self,
        _submission_id: &str,
        _filename: &str,
        _content: Bytes,
    ) -> Result<(), AppError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Remote("upload failed".to_string()));
        }
        Ok(())
    }

    async fn get_submission_info(&self, submission_id: &str) -> Result<SubmissionInfo, AppError> {
        let status = self
            .submission_status
            .lock()
            .unwrap()
            .unwrap_or(RemoteSubmissionStatus::Complete);
        Ok(SubmissionInfo {
            id: submission_id.to_string(),
            status,
            error_code: None,
        })
    }

    async fn schedule_similarity(
        &self,
        _submission_id: &str,
        _settings: &SimilaritySettings,
    ) -> Result<(), AppError> {
        if self.fail_scheduling.load(Ordering::SeqCst) {
            return Err(AppError::Remote("scheduling failed".to_string()));
        }
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_similarity_result(
        &self,
        submission_id: &str,
    ) -> Result<SimilarityPayload, AppError> {
        if self.fail_similarity_polls.load(Ordering::SeqCst) {
            return Err(AppError::Remote("similarity poll failed".to_string()));
        }
        Ok(self
            .similarity_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| fixtures::similarity_payload(submission_id, "COMPLETE", 10)))
    }

    async fn create_viewer_url(
        &self,
        submission_id: &str,
        viewer_ref: &str,
    ) -> Result<String, AppError> {
        Ok(format!(
            "https://viewer.example.com/{}?as={}",
            submission_id, viewer_ref
        ))
    }

    async fn validate_eula_version(&self, version: &str) -> Result<EulaVersionInfo, AppError> {
        let version = if version == "latest" { "v2" } else { version };
        Ok(EulaVersionInfo {
            version: version.to_string(),
            url: format!("https://scan.example.com/eula/{}", version),
        })
    }

    async fn confirm_eula(&self, _actor_ref: &str, _version: &str) -> Result<(), AppError> {
        self.confirm_eula_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Entity builders used across service tests.
pub mod fixtures {
    use super::*;

    pub fn tenant(requires_eula: bool) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "acme".to_string(),
            webhook_id: Some("wh-1".to_string()),
            webhook_signing_secret: Some("top-secret".to_string()),
            requires_eula,
            enabled: true,
            similarity_settings: SimilaritySettings::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn submission(tenant_id: Uuid) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            tenant_id,
            eula_version: None,
            eula_url: None,
            eula_accepted_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn actor() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            external_ref: "user-1".to_string(),
            eula_version: None,
            eula_accepted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn document(submission_id: Uuid, status: DocumentStatus) -> Document {
        Document {
            id: Uuid::new_v4(),
            submission_id,
            external_id: None,
            status,
            accepted_at: None,
            similarity_scheduled: false,
            similarity_report: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn document_with_external(
        submission_id: Uuid,
        status: DocumentStatus,
        external_id: &str,
    ) -> Document {
        Document {
            external_id: Some(external_id.to_string()),
            ..document(submission_id, status)
        }
    }

    /// A document whose similarity check has been scheduled.
    pub fn scheduled_document(
        submission_id: Uuid,
        status: DocumentStatus,
        external_id: &str,
    ) -> Document {
        Document {
            accepted_at: Some(Utc::now()),
            similarity_scheduled: true,
            ..document_with_external(submission_id, status, external_id)
        }
    }

    pub fn similarity_payload(external_id: &str, status: &str, score: i32) -> SimilarityPayload {
        SimilarityPayload {
            submission_id: external_id.to_string(),
            status: status.to_string(),
            overall_match_percentage: Some(score),
            internet_match_percentage: Some(score / 2),
            publication_match_percentage: None,
            submitted_works_match_percentage: None,
            time_requested: Some(Utc::now()),
            time_generated: if status == "COMPLETE" {
                Some(Utc::now())
            } else {
                None
            },
        }
    }
}
