//! Veriscan Database Layer
//!
//! This crate provides the sqlx/Postgres repositories for the lifecycle
//! orchestrator, plus the store trait seams the services are written
//! against so they can be tested without a database.

pub mod db;
pub mod store;

pub use db::{ActorRepository, DocumentRepository, SubmissionRepository, TenantRepository};
pub use store::{ActorStore, DocumentStore, SubmissionStore, TenantStore};
