//! Callback simulator.
//!
//! A cycle-based daemon, active only in test/development deployments, that
//! validates the webhook contract end-to-end without a live remote service.
//! Each cycle it scans persisted documents for the two "awaiting" sets,
//! synthesizes correctly signed callbacks, and posts them through the exact
//! gateway endpoint a production sender would use.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use veriscan_core::constants::SIMULATED_SUBMISSION_PREFIX;
use veriscan_core::models::{CallbackEventType, Document, DocumentStatus, Tenant};
use veriscan_core::{AppError, Config};
use veriscan_db::DocumentRepository;
use veriscan_services::sign_body;

/// Granularity of the interruptible inter-cycle sleep: a shutdown signal is
/// honored within this window even mid-interval.
const SLEEP_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Document reads the simulator needs; a trait seam so cycles can be tested
/// without a database.
#[async_trait]
pub trait SimulatorStore: Send + Sync {
    async fn list_awaiting_acceptance(&self, limit: i64) -> Result<Vec<Document>, AppError>;
    async fn list_similarity_pending(&self, limit: i64) -> Result<Vec<Document>, AppError>;
}

#[async_trait]
impl SimulatorStore for DocumentRepository {
    async fn list_awaiting_acceptance(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        self.list_by_status(DocumentStatus::AwaitingAcceptance, limit)
            .await
    }

    async fn list_similarity_pending(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        self.list_by_status(DocumentStatus::SimilarityPending, limit)
            .await
    }
}

/// Delivery seam: posts one synthesized callback to the gateway endpoint.
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(
        &self,
        tenant_id: Uuid,
        event_type: CallbackEventType,
        signature: &str,
        body: Vec<u8>,
    ) -> Result<()>;
}

/// Production sender: HTTP POST against the same endpoint the remote service
/// is registered to call.
pub struct HttpCallbackSender {
    client: reqwest::Client,
    endpoint_base: String,
}

impl HttpCallbackSender {
    pub fn new(endpoint_base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint_base: endpoint_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(
        &self,
        tenant_id: Uuid,
        event_type: CallbackEventType,
        signature: &str,
        body: Vec<u8>,
    ) -> Result<()> {
        let url = format!("{}/api/v0/callbacks/{}", self.endpoint_base, tenant_id);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header(veriscan_services::gateway::EVENT_TYPE_HEADER, event_type.to_string())
            .header(veriscan_services::gateway::SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Gateway returned status {}", response.status());
        }
        Ok(())
    }
}

/// One synthesized callback, ready to sign and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackJob {
    pub document_id: Uuid,
    pub external_id: String,
    pub event_type: CallbackEventType,
}

/// Select this cycle's work from the two awaiting sets, bounded by the
/// per-cycle cap. Acceptance callbacks are only fabricated for synthetic
/// test ids; documents beyond the cap defer to the next cycle.
pub fn select_cycle_jobs(
    awaiting_acceptance: Vec<Document>,
    similarity_pending: Vec<Document>,
    cap: usize,
) -> Vec<CallbackJob> {
    let mut jobs = Vec::with_capacity(cap);

    for document in awaiting_acceptance {
        if jobs.len() >= cap {
            break;
        }
        let Some(external_id) = document.external_id else {
            continue;
        };
        if !external_id.starts_with(SIMULATED_SUBMISSION_PREFIX) {
            continue;
        }
        jobs.push(CallbackJob {
            document_id: document.id,
            external_id,
            event_type: CallbackEventType::SubmissionComplete,
        });
    }

    for document in similarity_pending {
        if jobs.len() >= cap {
            break;
        }
        let Some(external_id) = document.external_id else {
            continue;
        };
        jobs.push(CallbackJob {
            document_id: document.id,
            external_id,
            event_type: CallbackEventType::SimilarityComplete,
        });
    }

    jobs
}

/// Synthesize the JSON body for a job. Scores are derived from the document
/// id so repeated runs stay deterministic.
pub fn synthesize_body(job: &CallbackJob) -> Vec<u8> {
    let body = match job.event_type {
        CallbackEventType::SubmissionComplete => serde_json::json!({
            "id": job.external_id,
            "status": "COMPLETE",
        }),
        _ => {
            let score = i32::from(job.document_id.as_bytes()[0]) % 101;
            serde_json::json!({
                "submission_id": job.external_id,
                "status": "COMPLETE",
                "overall_match_percentage": score,
                "internet_match_percentage": score / 2,
                "submitted_works_match_percentage": score / 3,
                "time_requested": Utc::now(),
                "time_generated": Utc::now(),
            })
        }
    };
    serde_json::to_vec(&body).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub dry_run: bool,
    /// None runs until shutdown; Some(n) stops after n cycles.
    pub max_cycles: Option<u64>,
    pub cycle_cap: usize,
    pub interval: Duration,
}

/// Summary of one completed cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleReport {
    pub processed: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Simulator {
    tenant: Tenant,
    store: Box<dyn SimulatorStore>,
    sender: Box<dyn CallbackSender>,
    config: SimulatorConfig,
}

impl Simulator {
    /// Verify daemon prerequisites before any cycle runs. These are
    /// configuration errors, not retryable conditions.
    pub fn preflight(app_config: &Config, tenant: &Tenant) -> Result<(), AppError> {
        if !app_config.is_test_mode() {
            return Err(AppError::Configuration(format!(
                "Simulator only runs in test mode (environment is '{}')",
                app_config.environment
            )));
        }
        if !tenant.enabled {
            return Err(AppError::Configuration(format!(
                "Integration is disabled for tenant {}",
                tenant.name
            )));
        }
        if !tenant.webhook_configured() {
            return Err(AppError::Configuration(format!(
                "Tenant {} has no webhook registration/secret",
                tenant.name
            )));
        }
        Ok(())
    }

    pub fn new(
        tenant: Tenant,
        store: Box<dyn SimulatorStore>,
        sender: Box<dyn CallbackSender>,
        config: SimulatorConfig,
    ) -> Self {
        Self {
            tenant,
            store,
            sender,
            config,
        }
    }

    /// Run one cycle: scan, select up to the cap, sign and deliver. The cap
    /// terminates the cycle's remaining work, not the daemon; deferred
    /// documents are picked up next cycle.
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant.name))]
    pub async fn run_cycle(&self) -> Result<CycleReport, AppError> {
        let cap = self.config.cycle_cap as i64;
        let awaiting = self.store.list_awaiting_acceptance(cap).await?;
        let pending = self.store.list_similarity_pending(cap).await?;
        let jobs = select_cycle_jobs(awaiting, pending, self.config.cycle_cap);

        let mut report = CycleReport {
            processed: jobs.len(),
            ..Default::default()
        };

        // webhook_configured was checked in preflight.
        let Some(secret) = self.tenant.webhook_signing_secret.as_deref() else {
            return Err(AppError::Configuration(
                "Tenant lost its signing secret".to_string(),
            ));
        };

        for job in jobs {
            let body = synthesize_body(&job);
            let signature = sign_body(secret, &body);

            if self.config.dry_run {
                tracing::info!(
                    document_id = %job.document_id,
                    event = %job.event_type,
                    "Dry run: would deliver callback"
                );
                continue;
            }

            match self
                .sender
                .send(self.tenant.id, job.event_type, &signature, body)
                .await
            {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::info!(
                        document_id = %job.document_id,
                        event = %job.event_type,
                        "Callback delivered"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        document_id = %job.document_id,
                        event = %job.event_type,
                        error = %e,
                        "Callback delivery failed"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Run cycles until the configured count is exhausted or shutdown is
    /// requested. Shutdown stops the daemon between cycles, never
    /// mid-callback; the inter-cycle sleep checks the token every second.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        let mut completed: u64 = 0;

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Shutdown requested, stopping simulator");
                return Ok(());
            }

            let report = self.run_cycle().await?;
            completed += 1;
            tracing::info!(
                cycle = completed,
                processed = report.processed,
                delivered = report.delivered,
                failed = report.failed,
                "Cycle complete"
            );

            if let Some(max) = self.config.max_cycles {
                if completed >= max {
                    tracing::info!(cycles = completed, "Cycle budget exhausted, stopping");
                    return Ok(());
                }
            }

            self.interruptible_sleep(&shutdown).await;
        }
    }

    async fn interruptible_sleep(&self, shutdown: &CancellationToken) {
        let mut remaining = self.config.interval;
        while !remaining.is_zero() && !shutdown.is_cancelled() {
            let step = remaining.min(SLEEP_CHECK_INTERVAL);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(step) => {}
            }
            remaining = remaining.saturating_sub(step);
        }
    }
}
