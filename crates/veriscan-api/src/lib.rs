//! Veriscan API server library.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
