use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Per-document lifecycle state.
///
/// `SimilarityAvailable` is terminal for the check cycle but re-entrant: a
/// later update event may replace the report with fresh data. There is no
/// persisted error state; failures leave the document where it was so the
/// action can be retried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Unsubmitted,
    Uploading,
    AwaitingAcceptance,
    Accepted,
    ScheduleRequested,
    SimilarityPending,
    SimilarityAvailable,
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentStatus::Unsubmitted => write!(f, "unsubmitted"),
            DocumentStatus::Uploading => write!(f, "uploading"),
            DocumentStatus::AwaitingAcceptance => write!(f, "awaiting_acceptance"),
            DocumentStatus::Accepted => write!(f, "accepted"),
            DocumentStatus::ScheduleRequested => write!(f, "schedule_requested"),
            DocumentStatus::SimilarityPending => write!(f, "similarity_pending"),
            DocumentStatus::SimilarityAvailable => write!(f, "similarity_available"),
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsubmitted" => Ok(DocumentStatus::Unsubmitted),
            "uploading" => Ok(DocumentStatus::Uploading),
            "awaiting_acceptance" => Ok(DocumentStatus::AwaitingAcceptance),
            "accepted" => Ok(DocumentStatus::Accepted),
            "schedule_requested" => Ok(DocumentStatus::ScheduleRequested),
            "similarity_pending" => Ok(DocumentStatus::SimilarityPending),
            "similarity_available" => Ok(DocumentStatus::SimilarityAvailable),
            _ => Err(anyhow::anyhow!("Invalid document status: {}", s)),
        }
    }
}

impl DocumentStatus {
    /// A fresh document that has never reached the remote service.
    pub fn can_submit(&self) -> bool {
        matches!(self, DocumentStatus::Unsubmitted)
    }

    /// Upload sent, waiting for the remote service to confirm ingestion.
    pub fn can_confirm_acceptance(&self) -> bool {
        matches!(self, DocumentStatus::AwaitingAcceptance)
    }

    /// Ingestion confirmed, similarity not yet requested.
    pub fn can_schedule_similarity(&self) -> bool {
        matches!(self, DocumentStatus::Accepted)
    }

    /// A similarity result may land: first delivery or a re-entrant update.
    pub fn can_apply_similarity(&self) -> bool {
        matches!(
            self,
            DocumentStatus::SimilarityPending | DocumentStatus::SimilarityAvailable
        )
    }
}

/// Structured outcome of a completed similarity check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityReport {
    pub overall_score: i32,
    pub internet_score: Option<i32>,
    pub publication_score: Option<i32>,
    pub submitted_works_score: Option<i32>,
    pub status: String,
    pub requested_at: Option<DateTime<Utc>>,
    pub generated_at: Option<DateTime<Utc>>,
    /// Last viewer URL minted for this report, if any.
    pub viewer_url: Option<String>,
}

impl SimilarityReport {
    /// Only complete reports are ever applied; anything else is presumed
    /// premature and will be re-delivered or re-polled later.
    pub fn is_complete(&self) -> bool {
        self.status == "COMPLETE"
    }
}

/// One uploaded file undergoing a similarity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Owning submission (aggregate of one or more documents).
    pub submission_id: Uuid,
    /// Remote submission id; absent until the upload has been accepted.
    pub external_id: Option<String>,
    pub status: DocumentStatus,
    /// Set once when the remote service confirms ingestion. Monotonic: never
    /// cleared or overwritten.
    pub accepted_at: Option<DateTime<Utc>>,
    pub similarity_scheduled: bool,
    pub similarity_report: Option<SimilarityReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Document {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let report = row
            .get::<Option<serde_json::Value>, _>("similarity_report")
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse similarity_report: {}", e).into())
            })?;
        Ok(Document {
            id: row.get("id"),
            submission_id: row.get("submission_id"),
            external_id: row.get("external_id"),
            status: row.get::<String, _>("status").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse document status: {}", e).into())
            })?,
            accepted_at: row.get("accepted_at"),
            similarity_scheduled: row.get("similarity_scheduled"),
            similarity_report: report,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Document {
    /// Core invariant: a report only ever exists on a document whose
    /// similarity check was scheduled.
    pub fn invariants_hold(&self) -> bool {
        self.similarity_report.is_none() || self.similarity_scheduled
    }
}
