use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate of one or more documents submitted together.
///
/// The EULA stamp (`eula_version` + `eula_url` + `eula_accepted_at`) is
/// write-once: re-confirmation of an already-stamped submission creates no
/// new stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Submission {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub eula_version: Option<String>,
    pub eula_url: Option<String>,
    pub eula_accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn has_eula_stamp(&self) -> bool {
        self.eula_version.is_some()
    }
}
