//! Domain methods for the remote similarity API.
//!
//! The lifecycle services depend on the [`RemoteScanApi`] trait; the CLI uses
//! the webhook-administration methods on [`ScanApiClient`] directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use veriscan_core::models::{RemoteSubmissionStatus, SimilarityPayload, SimilaritySettings};
use veriscan_core::AppError;

use crate::ScanApiClient;

/// Remote submission record as returned by create/info calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionInfo {
    pub id: String,
    pub status: RemoteSubmissionStatus,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerUrlResponse {
    pub viewer_url: String,
}

/// Active EULA version metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EulaVersionInfo {
    pub version: String,
    pub url: String,
}

/// Registered webhook record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub id: String,
    pub url: String,
    pub event_types: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateSubmissionRequest<'a> {
    owner: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct SimilarityGenerationRequest<'a> {
    generation_settings: &'a SimilaritySettings,
}

#[derive(Debug, Serialize)]
struct ViewerUrlRequest<'a> {
    viewer_user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ConfirmEulaRequest<'a> {
    user_id: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterWebhookRequest<'a> {
    url: &'a str,
    signing_secret: &'a str,
    event_types: &'a [&'a str],
}

/// All callback event types a registration subscribes to.
const WEBHOOK_EVENT_TYPES: [&str; 5] = [
    "SUBMISSION_COMPLETE",
    "SIMILARITY_COMPLETE",
    "SIMILARITY_UPDATED",
    "PDF_STATUS",
    "GROUP_ATTACHMENT_COMPLETE",
];

/// The remote operations the lifecycle services need. Narrower than the full
/// client surface: webhook administration stays on the concrete client.
#[async_trait]
pub trait RemoteScanApi: Send + Sync {
    /// Create a remote submission; returns the external submission id.
    async fn create_submission(&self, owner: &str, title: &str) -> Result<String, AppError>;

    async fn upload_file(
        &self,
        submission_id: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<(), AppError>;

    async fn get_submission_info(&self, submission_id: &str) -> Result<SubmissionInfo, AppError>;

    async fn schedule_similarity(
        &self,
        submission_id: &str,
        settings: &SimilaritySettings,
    ) -> Result<(), AppError>;

    async fn get_similarity_result(
        &self,
        submission_id: &str,
    ) -> Result<SimilarityPayload, AppError>;

    /// Mint a per-user viewer URL for a completed report.
    async fn create_viewer_url(
        &self,
        submission_id: &str,
        viewer_ref: &str,
    ) -> Result<String, AppError>;

    /// Fetch the currently active EULA version ("latest") or validate a
    /// specific one.
    async fn validate_eula_version(&self, version: &str) -> Result<EulaVersionInfo, AppError>;

    /// Mirror a local acceptance to the remote service.
    async fn confirm_eula(&self, actor_ref: &str, version: &str) -> Result<(), AppError>;
}

fn remote_err(e: anyhow::Error) -> AppError {
    AppError::Remote(format!("{:#}", e))
}

#[async_trait]
impl RemoteScanApi for ScanApiClient {
    async fn create_submission(&self, owner: &str, title: &str) -> Result<String, AppError> {
        let info: SubmissionInfo = self
            .post_json("/submissions", &CreateSubmissionRequest { owner, title })
            .await
            .map_err(remote_err)?;
        Ok(info.id)
    }

    async fn upload_file(
        &self,
        submission_id: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<(), AppError> {
        self.put_bytes(
            &format!("/submissions/{}/original", submission_id),
            filename,
            content,
        )
        .await
        .map_err(remote_err)
    }

    async fn get_submission_info(&self, submission_id: &str) -> Result<SubmissionInfo, AppError> {
        self.get(&format!("/submissions/{}", submission_id))
            .await
            .map_err(remote_err)
    }

    async fn schedule_similarity(
        &self,
        submission_id: &str,
        settings: &SimilaritySettings,
    ) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/submissions/{}/similarity", submission_id),
                &SimilarityGenerationRequest {
                    generation_settings: settings,
                },
            )
            .await
            .map_err(remote_err)?;
        Ok(())
    }

    async fn get_similarity_result(
        &self,
        submission_id: &str,
    ) -> Result<SimilarityPayload, AppError> {
        self.get(&format!("/submissions/{}/similarity", submission_id))
            .await
            .map_err(remote_err)
    }

    async fn create_viewer_url(
        &self,
        submission_id: &str,
        viewer_ref: &str,
    ) -> Result<String, AppError> {
        let response: ViewerUrlResponse = self
            .post_json(
                &format!("/submissions/{}/viewer-url", submission_id),
                &ViewerUrlRequest {
                    viewer_user_id: viewer_ref,
                },
            )
            .await
            .map_err(remote_err)?;
        Ok(response.viewer_url)
    }

    async fn validate_eula_version(&self, version: &str) -> Result<EulaVersionInfo, AppError> {
        self.get(&format!("/eula/{}", version))
            .await
            .map_err(remote_err)
    }

    async fn confirm_eula(&self, actor_ref: &str, version: &str) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/eula/{}/accept", version),
                &ConfirmEulaRequest {
                    user_id: actor_ref,
                    version,
                },
            )
            .await
            .map_err(remote_err)?;
        Ok(())
    }
}

impl ScanApiClient {
    /// Register this deployment's callback endpoint with the remote service.
    /// Returns the remote-side webhook id.
    pub async fn register_webhook(
        &self,
        callback_url: &str,
        signing_secret: &str,
    ) -> Result<WebhookInfo> {
        self.post_json(
            "/webhooks",
            &RegisterWebhookRequest {
                url: callback_url,
                signing_secret,
                event_types: &WEBHOOK_EVENT_TYPES,
            },
        )
        .await
        .context("Failed to register webhook")
    }

    /// Update an existing webhook registration in place.
    pub async fn update_webhook(
        &self,
        webhook_id: &str,
        callback_url: &str,
        signing_secret: &str,
    ) -> Result<WebhookInfo> {
        self.post_json(
            &format!("/webhooks/{}", webhook_id),
            &RegisterWebhookRequest {
                url: callback_url,
                signing_secret,
                event_types: &WEBHOOK_EVENT_TYPES,
            },
        )
        .await
        .context("Failed to update webhook")
    }

    pub async fn get_webhook(&self, webhook_id: &str) -> Result<WebhookInfo> {
        self.get(&format!("/webhooks/{}", webhook_id))
            .await
            .context("Failed to fetch webhook")
    }

    pub async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>> {
        self.get("/webhooks").await.context("Failed to list webhooks")
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        self.delete(&format!("/webhooks/{}", webhook_id))
            .await
            .context("Failed to delete webhook")
    }
}
