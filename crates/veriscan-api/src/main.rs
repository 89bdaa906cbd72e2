use anyhow::{Context, Result};
use std::sync::Arc;

use veriscan_api::setup::{database, routes, server};
use veriscan_api::state::AppState;
use veriscan_api::telemetry;
use veriscan_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let pool = database::setup_database(&config).await?;
    let state = Arc::new(AppState::new(config.clone(), pool)?);

    let app = routes::setup_routes(state);
    server::start_server(&config, app).await
}
