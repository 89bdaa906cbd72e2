//! EULA gate service.
//!
//! Wraps the pure stamp-matching logic from `veriscan-core` with the stores
//! and the remote version lookup. Stamps are write-once at the storage layer,
//! so confirming twice is always a safe no-op.

use std::sync::Arc;
use uuid::Uuid;

use veriscan_client::{EulaVersionInfo, RemoteScanApi};
use veriscan_core::models::Tenant;
use veriscan_core::{confirmation_required, AppError};
use veriscan_db::{ActorStore, SubmissionStore};

pub struct EulaGate {
    submissions: Arc<dyn SubmissionStore>,
    actors: Arc<dyn ActorStore>,
    remote: Arc<dyn RemoteScanApi>,
}

impl EulaGate {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        actors: Arc<dyn ActorStore>,
        remote: Arc<dyn RemoteScanApi>,
    ) -> Self {
        Self {
            submissions,
            actors,
            remote,
        }
    }

    /// Whether the pair still needs to confirm before unattended actions run.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
    pub async fn is_confirmation_required(
        &self,
        tenant: &Tenant,
        submission_id: Uuid,
        actor_id: Uuid,
    ) -> Result<bool, AppError> {
        if !tenant.requires_eula {
            return Ok(false);
        }
        let submission = self
            .submissions
            .get_by_id(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;
        let actor = self
            .actors
            .get_by_id(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Actor {} not found", actor_id)))?;

        Ok(confirmation_required(tenant, &submission, &actor))
    }

    /// The currently active EULA version and URL, from the remote service.
    pub async fn current_version(&self) -> Result<EulaVersionInfo, AppError> {
        self.remote.validate_eula_version("latest").await
    }

    /// Record acceptance of the current version on both entities and mirror
    /// it to the remote service. Each stamp is applied at most once; an
    /// already-stamped entity keeps its original version.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
    pub async fn confirm(
        &self,
        tenant: &Tenant,
        submission_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), AppError> {
        if !tenant.requires_eula {
            return Ok(());
        }

        let info = self.current_version().await?;

        self.submissions
            .stamp_eula(submission_id, &info.version, &info.url)
            .await?;
        self.actors.stamp_eula(actor_id, &info.version).await?;

        let actor = self
            .actors
            .get_by_id(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Actor {} not found", actor_id)))?;
        if let Err(e) = self
            .remote
            .confirm_eula(&actor.external_ref, &info.version)
            .await
        {
            // The local stamp is authoritative; the remote mirror is best effort.
            tracing::warn!(actor_id = %actor_id, error = %e, "Failed to mirror EULA acceptance to remote service");
        }

        tracing::info!(
            submission_id = %submission_id,
            actor_id = %actor_id,
            version = %info.version,
            "EULA acceptance stamped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MemoryStores, RecordingScanApi};

    fn gate(stores: &MemoryStores, remote: &Arc<RecordingScanApi>) -> EulaGate {
        EulaGate::new(
            stores.submissions(),
            stores.actors(),
            remote.clone() as Arc<dyn RemoteScanApi>,
        )
    }

    #[tokio::test]
    async fn test_confirm_stamps_both_entities() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(true));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let actor = stores.insert_actor(fixtures::actor());

        let gate = gate(&stores, &remote);
        assert!(gate
            .is_confirmation_required(&tenant, submission.id, actor.id)
            .await
            .unwrap());

        gate.confirm(&tenant, submission.id, actor.id).await.unwrap();

        assert!(!gate
            .is_confirmation_required(&tenant, submission.id, actor.id)
            .await
            .unwrap());
        assert_eq!(
            stores.submission(submission.id).eula_version.as_deref(),
            Some("v2")
        );
        assert_eq!(stores.actor(actor.id).eula_version.as_deref(), Some("v2"));
        assert_eq!(remote.confirm_eula_calls(), 1);
    }

    #[tokio::test]
    async fn test_confirm_twice_keeps_first_stamp() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(true));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let actor = stores.insert_actor(fixtures::actor());

        let gate = gate(&stores, &remote);
        gate.confirm(&tenant, submission.id, actor.id).await.unwrap();
        let first = stores.submission(submission.id).eula_accepted_at;

        gate.confirm(&tenant, submission.id, actor.id).await.unwrap();
        assert_eq!(stores.submission(submission.id).eula_accepted_at, first);
    }

    #[tokio::test]
    async fn test_mismatched_versions_require_reconfirmation() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(true));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let actor = stores.insert_actor(fixtures::actor());
        stores.stamp_submission(submission.id, "v1");
        stores.stamp_actor(actor.id, "v2");

        let gate = gate(&stores, &remote);
        assert!(gate
            .is_confirmation_required(&tenant, submission.id, actor.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_tenant_opt_out_skips_gate() {
        let stores = MemoryStores::new();
        let remote = Arc::new(RecordingScanApi::default());
        let tenant = stores.insert_tenant(fixtures::tenant(false));
        let submission = stores.insert_submission(fixtures::submission(tenant.id));
        let actor = stores.insert_actor(fixtures::actor());

        let gate = gate(&stores, &remote);
        assert!(!gate
            .is_confirmation_required(&tenant, submission.id, actor.id)
            .await
            .unwrap());
    }
}
