//! Veriscan Services
//!
//! The lifecycle orchestrator core: the per-document state machine, the EULA
//! gate, the webhook ingestion gateway, and the status broadcaster. All
//! services take their stores and the remote client as trait objects, so they
//! can be exercised against in-memory fakes.

pub mod broadcaster;
pub mod eula;
pub mod gateway;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcaster::{
    negotiate_duration, SnapshotParams, StatusBroadcaster, StatusSnapshot, StreamBudget,
    StreamEvent,
};
pub use eula::EulaGate;
pub use gateway::{sign_body, GatewayOutcome, RejectReason, WebhookGateway};
pub use lifecycle::{
    AcceptanceOutcome, LifecycleService, PostConfirmAction, ScheduleOutcome, SimilarityOutcome,
};
