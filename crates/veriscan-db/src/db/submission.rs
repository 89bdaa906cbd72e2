use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use veriscan_core::models::Submission;
use veriscan_core::AppError;

/// Repository for submissions (document aggregates and their EULA stamp).
#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "insert"))]
    pub async fn create(&self, tenant_id: Uuid) -> Result<Submission, AppError> {
        let submission = sqlx::query_as::<Postgres, Submission>(
            r#"
            INSERT INTO submissions (tenant_id)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(submission)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        let submission =
            sqlx::query_as::<Postgres, Submission>("SELECT * FROM submissions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(submission)
    }

    /// Stamp the EULA acceptance exactly once. The `WHERE eula_version IS
    /// NULL` guard makes re-stamping a no-op, never an error.
    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "update", db.record_id = %id))]
    pub async fn stamp_eula(&self, id: Uuid, version: &str, url: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET eula_version = $2,
                eula_url = $3,
                eula_accepted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND eula_version IS NULL
            "#,
        )
        .bind(id)
        .bind(version)
        .bind(url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(submission_id = %id, "Submission already stamped, keeping existing EULA version");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "update", db.record_id = %id))]
    pub async fn mark_completed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET completed_at = COALESCE(completed_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
