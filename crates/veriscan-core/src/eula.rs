//! EULA gate logic.
//!
//! Acceptance is stamped independently on two entities: the acting user and
//! the submission. Both stamps must exist and carry a matching version before
//! unattended actions are allowed. The version comparison catches stale
//! acceptance of a since-changed agreement.

use crate::models::{Actor, Submission, Tenant};

/// Whether the user/submission pair may proceed without re-confirming the
/// legal agreement.
///
/// Returns false when the tenant does not require acceptance; true when
/// either entity lacks a stamp; true when both are stamped but the versions
/// differ; false otherwise.
pub fn confirmation_required(tenant: &Tenant, submission: &Submission, actor: &Actor) -> bool {
    if !tenant.requires_eula {
        return false;
    }
    match (&submission.eula_version, &actor.eula_version) {
        (Some(submission_version), Some(actor_version)) => submission_version != actor_version,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimilaritySettings;
    use chrono::Utc;
    use uuid::Uuid;

    fn tenant(requires_eula: bool) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "acme".to_string(),
            webhook_id: None,
            webhook_signing_secret: None,
            requires_eula,
            enabled: true,
            similarity_settings: SimilaritySettings::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn submission(version: Option<&str>) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            eula_version: version.map(String::from),
            eula_url: version.map(|_| "https://example.com/eula".to_string()),
            eula_accepted_at: version.map(|_| Utc::now()),
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn actor(version: Option<&str>) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            external_ref: "user-1".to_string(),
            eula_version: version.map(String::from),
            eula_accepted_at: version.map(|_| Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_not_required_when_tenant_opts_out() {
        assert!(!confirmation_required(
            &tenant(false),
            &submission(None),
            &actor(None)
        ));
    }

    #[test]
    fn test_required_when_either_stamp_missing() {
        let t = tenant(true);
        assert!(confirmation_required(&t, &submission(None), &actor(None)));
        assert!(confirmation_required(
            &t,
            &submission(Some("v2")),
            &actor(None)
        ));
        assert!(confirmation_required(
            &t,
            &submission(None),
            &actor(Some("v2"))
        ));
    }

    #[test]
    fn test_required_when_versions_differ() {
        assert!(confirmation_required(
            &tenant(true),
            &submission(Some("v1")),
            &actor(Some("v2"))
        ));
    }

    #[test]
    fn test_not_required_when_versions_match() {
        assert!(!confirmation_required(
            &tenant(true),
            &submission(Some("v2")),
            &actor(Some("v2"))
        ));
    }
}
