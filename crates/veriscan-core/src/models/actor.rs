use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The submitting/acting user. Carries its own EULA stamp, independent of the
/// submission's stamp; both must hold a matching version before unattended
/// actions are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Actor {
    pub id: Uuid,
    /// Stable identifier sent to the remote service as the owner of uploads
    /// and viewer sessions.
    pub external_ref: String,
    pub eula_version: Option<String>,
    pub eula_accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Actor {
    pub fn has_eula_stamp(&self) -> bool {
        self.eula_version.is_some()
    }
}
