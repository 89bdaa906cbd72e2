use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use veriscan_core::models::{Document, DocumentStatus, SimilarityReport};
use veriscan_core::AppError;

/// Repository for per-document lifecycle state.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a document in its initial state for a submission.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "insert"))]
    pub async fn create(&self, submission_id: Uuid) -> Result<Document, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(
            r#"
            INSERT INTO documents (submission_id, status, similarity_scheduled)
            VALUES ($1, 'unsubmitted', false)
            RETURNING *
            "#,
        )
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let document =
            sqlx::query_as::<Postgres, Document>("SELECT * FROM documents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(document)
    }

    /// Resolve a document by the remote submission id embedded in callback
    /// payloads.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn get_by_external_id(&self, external_id: &str) -> Result<Option<Document>, AppError> {
        let document =
            sqlx::query_as::<Postgres, Document>("SELECT * FROM documents WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(
            "SELECT * FROM documents WHERE submission_id = $1 ORDER BY created_at ASC",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// List documents in a given lifecycle state, oldest first. Used by the
    /// callback simulator to find work; `limit` is the per-cycle cap.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn list_by_status(
        &self,
        status: DocumentStatus,
        limit: i64,
    ) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(
            "SELECT * FROM documents WHERE status = $1 ORDER BY updated_at ASC LIMIT $2",
        )
        .bind(status.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn set_status(&self, id: Uuid, status: DocumentStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE documents SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record a successful upload: store the remote submission id and move to
    /// awaiting acceptance.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn record_upload(&self, id: Uuid, external_id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE documents
            SET external_id = $2,
                status = 'awaiting_acceptance',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record remote ingestion acceptance. `accepted_at` is monotonic: the
    /// COALESCE keeps the first timestamp on duplicate confirmations.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn record_acceptance(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE documents
            SET accepted_at = COALESCE(accepted_at, NOW()),
                status = 'accepted',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically claim the similarity-scheduled flag. Returns true when this
    /// caller won the claim, false when the flag was already set. Closes the
    /// check-then-set race between concurrent callback deliveries.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn try_mark_similarity_scheduled(&self, id: Uuid) -> Result<bool, AppError> {
        let claimed = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            UPDATE documents
            SET similarity_scheduled = true,
                status = 'schedule_requested',
                updated_at = NOW()
            WHERE id = $1 AND similarity_scheduled = false
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    /// Release a claim taken by `try_mark_similarity_scheduled` after the
    /// remote scheduling call failed, so the action can be retried.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn release_similarity_claim(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE documents
            SET similarity_scheduled = false,
                status = 'accepted',
                updated_at = NOW()
            WHERE id = $1 AND similarity_scheduled = true AND similarity_report IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, report), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn store_report(&self, id: Uuid, report: &SimilarityReport) -> Result<(), AppError> {
        let payload = serde_json::to_value(report)?;
        sqlx::query(
            r#"
            UPDATE documents
            SET similarity_report = $2,
                status = 'similarity_available',
                updated_at = NOW()
            WHERE id = $1 AND similarity_scheduled = true
            "#,
        )
        .bind(id)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the last minted viewer URL on the stored report.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    pub async fn set_viewer_url(&self, id: Uuid, url: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE documents
            SET similarity_report = jsonb_set(similarity_report, '{viewer_url}', to_jsonb($2::text)),
                updated_at = NOW()
            WHERE id = $1 AND similarity_report IS NOT NULL
            "#,
        )
        .bind(id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
