use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::settings::SimilaritySettings;

/// Tenant (owning organization) entity. Each tenant carries its own webhook
/// registration and similarity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Remote-side id of the registered webhook; absent until registration.
    pub webhook_id: Option<String>,
    /// Secret used to verify inbound callback signatures. Opaque bytes,
    /// stored hex-encoded.
    pub webhook_signing_secret: Option<String>,
    pub requires_eula: bool,
    /// When false the integration is switched off for the tenant; daemons
    /// refuse to run against it.
    pub enabled: bool,
    pub similarity_settings: SimilaritySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Tenant {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let settings = serde_json::from_value(row.get::<serde_json::Value, _>(
            "similarity_settings",
        ))
        .map_err(|e| {
            sqlx::Error::Decode(format!("Failed to parse similarity_settings: {}", e).into())
        })?;
        Ok(Tenant {
            id: row.get("id"),
            name: row.get("name"),
            webhook_id: row.get("webhook_id"),
            webhook_signing_secret: row.get("webhook_signing_secret"),
            requires_eula: row.get("requires_eula"),
            enabled: row.get("enabled"),
            similarity_settings: settings,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Tenant {
    /// The ingestion gateway is considered unconfigured until both the
    /// registration id and the signing secret exist.
    pub fn webhook_configured(&self) -> bool {
        self.webhook_id.is_some() && self.webhook_signing_secret.is_some()
    }
}
