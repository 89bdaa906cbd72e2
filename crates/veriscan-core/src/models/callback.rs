//! Inbound callback event types and wire payloads.
//!
//! Payloads are ephemeral: parsed, applied through the lifecycle service, and
//! never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::document::SimilarityReport;

/// Recognized callback event types. `PdfStatus` and `GroupAttachmentComplete`
/// are accepted but produce no state transition (forward-compatible no-ops).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallbackEventType {
    SubmissionComplete,
    SimilarityComplete,
    SimilarityUpdated,
    PdfStatus,
    GroupAttachmentComplete,
}

impl Display for CallbackEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CallbackEventType::SubmissionComplete => write!(f, "SUBMISSION_COMPLETE"),
            CallbackEventType::SimilarityComplete => write!(f, "SIMILARITY_COMPLETE"),
            CallbackEventType::SimilarityUpdated => write!(f, "SIMILARITY_UPDATED"),
            CallbackEventType::PdfStatus => write!(f, "PDF_STATUS"),
            CallbackEventType::GroupAttachmentComplete => write!(f, "GROUP_ATTACHMENT_COMPLETE"),
        }
    }
}

impl FromStr for CallbackEventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMISSION_COMPLETE" => Ok(CallbackEventType::SubmissionComplete),
            "SIMILARITY_COMPLETE" => Ok(CallbackEventType::SimilarityComplete),
            "SIMILARITY_UPDATED" => Ok(CallbackEventType::SimilarityUpdated),
            "PDF_STATUS" => Ok(CallbackEventType::PdfStatus),
            "GROUP_ATTACHMENT_COMPLETE" => Ok(CallbackEventType::GroupAttachmentComplete),
            _ => Err(anyhow::anyhow!("Invalid callback event type: {}", s)),
        }
    }
}

/// Remote submission processing status, as reported by `SUBMISSION_COMPLETE`
/// payloads and by the synchronous submission-info poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteSubmissionStatus {
    Created,
    Processing,
    Complete,
    Error,
}

impl Display for RemoteSubmissionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RemoteSubmissionStatus::Created => write!(f, "CREATED"),
            RemoteSubmissionStatus::Processing => write!(f, "PROCESSING"),
            RemoteSubmissionStatus::Complete => write!(f, "COMPLETE"),
            RemoteSubmissionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Body of a `SUBMISSION_COMPLETE` callback: the remote service finished
/// ingesting the upload (or failed to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionCompletePayload {
    /// External submission id.
    pub id: String,
    pub status: RemoteSubmissionStatus,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Body of a `SIMILARITY_COMPLETE` / `SIMILARITY_UPDATED` callback, and of
/// the synchronous similarity poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityPayload {
    pub submission_id: String,
    pub status: String,
    #[serde(default)]
    pub overall_match_percentage: Option<i32>,
    #[serde(default)]
    pub internet_match_percentage: Option<i32>,
    #[serde(default)]
    pub publication_match_percentage: Option<i32>,
    #[serde(default)]
    pub submitted_works_match_percentage: Option<i32>,
    #[serde(default)]
    pub time_requested: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_generated: Option<DateTime<Utc>>,
}

impl SimilarityPayload {
    pub fn into_report(self) -> SimilarityReport {
        SimilarityReport {
            overall_score: self.overall_match_percentage.unwrap_or(0),
            internet_score: self.internet_match_percentage,
            publication_score: self.publication_match_percentage,
            submitted_works_score: self.submitted_works_match_percentage,
            status: self.status,
            requested_at: self.time_requested,
            generated_at: self.time_generated,
            viewer_url: None,
        }
    }
}

/// Minimal view of any callback body: just enough to resolve the target
/// document before full, type-specific parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRef {
    #[serde(alias = "submission_id")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_round_trip() {
        for et in [
            CallbackEventType::SubmissionComplete,
            CallbackEventType::SimilarityComplete,
            CallbackEventType::SimilarityUpdated,
            CallbackEventType::PdfStatus,
            CallbackEventType::GroupAttachmentComplete,
        ] {
            assert_eq!(et.to_string().parse::<CallbackEventType>().unwrap(), et);
        }
        assert!("SUBMISSION_DELETED".parse::<CallbackEventType>().is_err());
    }

    #[test]
    fn test_submission_complete_payload_parses_wire_status() {
        let payload: SubmissionCompletePayload = serde_json::from_str(
            r#"{"id": "ext-123", "status": "COMPLETE"}"#,
        )
        .unwrap();
        assert_eq!(payload.status, RemoteSubmissionStatus::Complete);
        assert_eq!(payload.error_code, None);
    }

    #[test]
    fn test_similarity_payload_into_report() {
        let payload: SimilarityPayload = serde_json::from_str(
            r#"{
                "submission_id": "ext-123",
                "status": "COMPLETE",
                "overall_match_percentage": 37,
                "internet_match_percentage": 25,
                "time_generated": "2026-03-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        let report = payload.into_report();
        assert_eq!(report.overall_score, 37);
        assert_eq!(report.internet_score, Some(25));
        assert_eq!(report.publication_score, None);
        assert!(report.is_complete());
    }

    #[test]
    fn test_callback_ref_accepts_both_id_spellings() {
        let by_id: CallbackRef = serde_json::from_str(r#"{"id": "ext-1"}"#).unwrap();
        assert_eq!(by_id.id, "ext-1");
        let by_submission_id: CallbackRef =
            serde_json::from_str(r#"{"submission_id": "ext-2", "status": "COMPLETE"}"#).unwrap();
        assert_eq!(by_submission_id.id, "ext-2");
    }
}
