//! Application state.
//!
//! All services are constructed once at startup with their dependencies
//! injected; handlers extract what they need from the shared state. No
//! process-wide statics.

use sqlx::PgPool;
use std::sync::Arc;

use veriscan_client::{RemoteScanApi, ScanApiClient};
use veriscan_core::Config;
use veriscan_db::{
    ActorRepository, DocumentRepository, SubmissionRepository, TenantRepository,
};
use veriscan_services::{EulaGate, LifecycleService, StatusBroadcaster, WebhookGateway};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub tenant_repository: TenantRepository,
    pub submission_repository: SubmissionRepository,
    pub actor_repository: ActorRepository,
    pub document_repository: DocumentRepository,
    pub lifecycle: Arc<LifecycleService>,
    pub eula_gate: EulaGate,
    pub gateway: WebhookGateway,
    pub broadcaster: Arc<StatusBroadcaster>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let tenant_repository = TenantRepository::new(pool.clone());
        let submission_repository = SubmissionRepository::new(pool.clone());
        let actor_repository = ActorRepository::new(pool.clone());
        let document_repository = DocumentRepository::new(pool.clone());

        let remote: Arc<dyn RemoteScanApi> = Arc::new(ScanApiClient::new(
            &config.remote_api_url,
            &config.remote_api_key,
            config.remote_timeout_seconds,
        )?);

        let lifecycle = Arc::new(LifecycleService::new(
            Arc::new(document_repository.clone()),
            Arc::new(submission_repository.clone()),
            Arc::new(actor_repository.clone()),
            Arc::new(tenant_repository.clone()),
            remote.clone(),
            config.suppress_remote_errors,
        ));

        let eula_gate = EulaGate::new(
            Arc::new(submission_repository.clone()),
            Arc::new(actor_repository.clone()),
            remote.clone(),
        );

        let gateway = WebhookGateway::new(
            Arc::new(tenant_repository.clone()),
            Arc::new(submission_repository.clone()),
            Arc::new(document_repository.clone()),
            lifecycle.clone(),
        );

        let broadcaster = Arc::new(StatusBroadcaster::new(
            Arc::new(tenant_repository.clone()),
            Arc::new(submission_repository.clone()),
            Arc::new(actor_repository.clone()),
            Arc::new(document_repository.clone()),
        ));

        Ok(Self {
            config,
            pool,
            tenant_repository,
            submission_repository,
            actor_repository,
            document_repository,
            lifecycle,
            eula_gate,
            gateway,
            broadcaster,
        })
    }
}
