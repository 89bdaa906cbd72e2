//! Veriscan Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! EULA gate logic shared across all Veriscan components.

pub mod config;
pub mod constants;
pub mod error;
pub mod eula;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use eula::confirmation_required;
