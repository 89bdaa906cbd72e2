use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use veriscan_core::models::Actor;
use veriscan_core::AppError;

/// Repository for acting users and their EULA stamp.
#[derive(Clone)]
pub struct ActorRepository {
    pool: PgPool,
}

impl ActorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "actors", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Actor>, AppError> {
        let actor = sqlx::query_as::<Postgres, Actor>("SELECT * FROM actors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(actor)
    }

    /// Fetch an actor by external reference, creating the row on first sight.
    #[tracing::instrument(skip(self), fields(db.table = "actors", db.operation = "upsert"))]
    pub async fn get_or_create(&self, external_ref: &str) -> Result<Actor, AppError> {
        let actor = sqlx::query_as::<Postgres, Actor>(
            r#"
            INSERT INTO actors (external_ref)
            VALUES ($1)
            ON CONFLICT (external_ref) DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(external_ref)
        .fetch_one(&self.pool)
        .await?;

        Ok(actor)
    }

    /// Stamp the EULA acceptance exactly once; re-stamping is a no-op.
    #[tracing::instrument(skip(self), fields(db.table = "actors", db.operation = "update", db.record_id = %id))]
    pub async fn stamp_eula(&self, id: Uuid, version: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE actors
            SET eula_version = $2,
                eula_accepted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND eula_version IS NULL
            "#,
        )
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(actor_id = %id, "Actor already stamped, keeping existing EULA version");
        }

        Ok(())
    }
}
