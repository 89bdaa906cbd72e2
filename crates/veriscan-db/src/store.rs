//! Store trait abstractions for service testing
//!
//! These traits define the minimal interface the lifecycle services need from
//! the repositories, allowing in-memory mocking without database
//! dependencies. The sqlx repositories implement them one-to-one.

use async_trait::async_trait;
use uuid::Uuid;

use veriscan_core::models::{Actor, Document, DocumentStatus, SimilarityReport, Submission, Tenant};
use veriscan_core::AppError;

use crate::db::{ActorRepository, DocumentRepository, SubmissionRepository, TenantRepository};

/// Document state reads and guarded writes needed by the lifecycle service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<Document>, AppError>;

    async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Document>, AppError>;

    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), AppError>;

    async fn record_upload(&self, id: Uuid, external_id: &str) -> Result<(), AppError>;

    async fn record_acceptance(&self, id: Uuid) -> Result<(), AppError>;

    /// Atomic claim of the scheduling flag; true when this caller won.
    async fn try_mark_similarity_scheduled(&self, id: Uuid) -> Result<bool, AppError>;

    /// Undo a claim after the remote scheduling call failed.
    async fn release_similarity_claim(&self, id: Uuid) -> Result<(), AppError>;

    async fn store_report(&self, id: Uuid, report: &SimilarityReport) -> Result<(), AppError>;

    async fn set_viewer_url(&self, id: Uuid, url: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Submission>, AppError>;

    /// Write-once stamp; a no-op when the submission already carries one.
    async fn stamp_eula(&self, id: Uuid, version: &str, url: &str) -> Result<(), AppError>;

    async fn mark_completed(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Actor>, AppError>;

    /// Write-once stamp; a no-op when the actor already carries one.
    async fn stamp_eula(&self, id: Uuid, version: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;
}

// Implementations for the concrete repositories

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        DocumentRepository::get_by_id(self, id).await
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<Document>, AppError> {
        DocumentRepository::get_by_external_id(self, external_id).await
    }

    async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Document>, AppError> {
        DocumentRepository::list_by_submission(self, submission_id).await
    }

    async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), AppError> {
        DocumentRepository::set_status(self, id, status).await
    }

    async fn record_upload(&self, id: Uuid, external_id: &str) -> Result<(), AppError> {
        DocumentRepository::record_upload(self, id, external_id).await
    }

    async fn record_acceptance(&self, id: Uuid) -> Result<(), AppError> {
        DocumentRepository::record_acceptance(self, id).await
    }

    async fn try_mark_similarity_scheduled(&self, id: Uuid) -> Result<bool, AppError> {
        DocumentRepository::try_mark_similarity_scheduled(self, id).await
    }

    async fn release_similarity_claim(&self, id: Uuid) -> Result<(), AppError> {
        DocumentRepository::release_similarity_claim(self, id).await
    }

    async fn store_report(&self, id: Uuid, report: &SimilarityReport) -> Result<(), AppError> {
        DocumentRepository::store_report(self, id, report).await
    }

    async fn set_viewer_url(&self, id: Uuid, url: &str) -> Result<(), AppError> {
        DocumentRepository::set_viewer_url(self, id, url).await
    }
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        SubmissionRepository::get_by_id(self, id).await
    }

    async fn stamp_eula(&self, id: Uuid, version: &str, url: &str) -> Result<(), AppError> {
        SubmissionRepository::stamp_eula(self, id, version, url).await
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), AppError> {
        SubmissionRepository::mark_completed(self, id).await
    }
}

#[async_trait]
impl ActorStore for ActorRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Actor>, AppError> {
        ActorRepository::get_by_id(self, id).await
    }

    async fn stamp_eula(&self, id: Uuid, version: &str) -> Result<(), AppError> {
        ActorRepository::stamp_eula(self, id, version).await
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        TenantRepository::get_by_id(self, id).await
    }
}
