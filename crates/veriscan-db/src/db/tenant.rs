use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use veriscan_core::models::{SimilaritySettings, Tenant};
use veriscan_core::AppError;

/// Repository for tenants: webhook registration and similarity settings.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "insert"))]
    pub async fn create(&self, name: &str, requires_eula: bool) -> Result<Tenant, AppError> {
        let settings = serde_json::to_value(SimilaritySettings::default())?;
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            INSERT INTO tenants (name, requires_eula, enabled, similarity_settings)
            VALUES ($1, $2, true, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(requires_eula)
        .bind(settings)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "Created tenant");
        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    /// Record a webhook registration (or clear it by passing None).
    #[tracing::instrument(skip(self, signing_secret), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn set_webhook_registration(
        &self,
        id: Uuid,
        webhook_id: Option<&str>,
        signing_secret: Option<&str>,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET webhook_id = $2,
                webhook_signing_secret = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(webhook_id)
        .bind(signing_secret)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if matches!(e, sqlx::Error::RowNotFound) {
                AppError::NotFound("Tenant not found".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self, settings), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn update_similarity_settings(
        &self,
        id: Uuid,
        settings: &SimilaritySettings,
    ) -> Result<Tenant, AppError> {
        let payload = serde_json::to_value(settings)?;
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET similarity_settings = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn list_enabled(&self) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<Postgres, Tenant>(
            "SELECT * FROM tenants WHERE enabled = true ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }
}
