//! Configuration module
//!
//! Env-backed configuration for the API server, the simulator daemon, and the
//! remote similarity client. Binaries call `dotenvy::dotenv().ok()` before
//! `Config::from_env()`, then `validate()` for fail-fast startup checks.

use std::env;

use crate::constants::{MAX_STREAM_DURATION_SECS, STREAM_TICK_SECS};

const DEFAULT_SERVER_PORT: u16 = 8086;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIMULATOR_INTERVAL_SECS: u64 = 30;
const DEFAULT_SIMULATOR_CYCLE_CAP: usize = 25;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Deployment environment string; "test" and "development" enable the
    /// callback simulator.
    pub environment: String,
    /// Base URL of the remote similarity-detection API.
    pub remote_api_url: String,
    pub remote_api_key: String,
    /// Bound applied to every remote call.
    pub remote_timeout_seconds: u64,
    /// When true, remote failures on fire-and-forget paths are logged and
    /// swallowed instead of surfaced to the caller.
    pub suppress_remote_errors: bool,
    /// Publicly reachable base URL of this service, registered with the
    /// remote service as the webhook target.
    pub callback_base_url: String,
    /// Execution-time limit imposed by the host, in seconds. 0 means none.
    /// Streaming sessions are further capped by this when set.
    pub host_execution_limit_secs: u64,
    pub stream_tick_seconds: u64,
    pub simulator_interval_seconds: u64,
    pub simulator_cycle_cap: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            server_port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT),
            database_url,
            environment: env_or("ENVIRONMENT", "development"),
            remote_api_url: env_or("REMOTE_API_URL", ""),
            remote_api_key: env_or("REMOTE_API_KEY", ""),
            remote_timeout_seconds: env_parse("REMOTE_TIMEOUT_SECONDS", DEFAULT_REMOTE_TIMEOUT_SECS),
            suppress_remote_errors: env_parse("SUPPRESS_REMOTE_ERRORS", false),
            callback_base_url: env_or("CALLBACK_BASE_URL", ""),
            host_execution_limit_secs: env_parse("HOST_EXECUTION_LIMIT_SECS", 0),
            stream_tick_seconds: env_parse("STREAM_TICK_SECONDS", STREAM_TICK_SECS),
            simulator_interval_seconds: env_parse(
                "SIMULATOR_INTERVAL_SECONDS",
                DEFAULT_SIMULATOR_INTERVAL_SECS,
            ),
            simulator_cycle_cap: env_parse("SIMULATOR_CYCLE_CAP", DEFAULT_SIMULATOR_CYCLE_CAP)
                .max(1),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.remote_api_url.is_empty() {
            anyhow::bail!("REMOTE_API_URL must be set");
        }
        if self.remote_api_key.is_empty() {
            anyhow::bail!("REMOTE_API_KEY must be set");
        }
        if self.stream_tick_seconds == 0 || self.stream_tick_seconds > MAX_STREAM_DURATION_SECS {
            anyhow::bail!(
                "STREAM_TICK_SECONDS must be between 1 and {}",
                MAX_STREAM_DURATION_SECS
            );
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// The callback simulator only runs in test/development deployments.
    pub fn is_test_mode(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "test" || env == "development" || env == "dev"
    }
}
