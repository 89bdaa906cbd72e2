//! HTTP client for the remote similarity-detection API.
//!
//! Provides a minimal client with bearer auth, bounded timeouts, generic
//! request helpers, and the domain methods of the remote REST surface. The
//! lifecycle services consume it through the [`api::RemoteScanApi`] trait so
//! tests can substitute a fake.

pub mod api;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use veriscan_core::constants::REACHABILITY_TIMEOUT_SECS;

/// HTTP client for the remote similarity API.
#[derive(Clone, Debug)]
pub struct ScanApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ScanApiClient {
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn read_success<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Remote API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse remote response as JSON")?;

        Ok(body)
    }

    /// GET request, deserializing the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.apply_auth(self.client.get(self.build_url(path)));
        let response = request.send().await.context("Failed to send request")?;
        Self::read_success(response).await
    }

    /// POST JSON body and deserialize the response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.post(self.build_url(path)).json(body));
        let response = request.send().await.context("Failed to send request")?;
        Self::read_success(response).await
    }

    /// PUT raw bytes (file upload). Returns Ok(()) on success.
    pub async fn put_bytes(
        &self,
        path: &str,
        filename: &str,
        content: bytes::Bytes,
    ) -> Result<()> {
        let request = self
            .apply_auth(self.client.put(self.build_url(path)))
            .header("Content-Type", "binary/octet-stream")
            .header(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", filename),
            )
            .body(content);
        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Remote upload failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(())
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.apply_auth(self.client.delete(self.build_url(path)));
        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Remote API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(())
    }
}

/// Probe whether a callback URL is reachable from this host, capped at 10
/// seconds. Tries HEAD first; some endpoints reject HEAD, so a failed probe
/// falls back to GET before giving up.
pub async fn check_reachability(url: &str) -> Result<bool> {
    let client = Client::builder()
        .timeout(Duration::from_secs(REACHABILITY_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")?;

    match client.head(url).send().await {
        Ok(response) if response.status().is_success() => return Ok(true),
        Ok(response) => {
            tracing::debug!(url, status = %response.status(), "HEAD probe rejected, falling back to GET");
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "HEAD probe failed, falling back to GET");
        }
    }

    match client.get(url).send().await {
        Ok(response) => Ok(response.status().is_success()),
        Err(_) => Ok(false),
    }
}

pub use api::{
    EulaVersionInfo, RemoteScanApi, SubmissionInfo, ViewerUrlResponse, WebhookInfo,
};
