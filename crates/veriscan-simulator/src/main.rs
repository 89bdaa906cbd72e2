use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use veriscan_core::Config;
use veriscan_db::TenantRepository;
use veriscan_simulator::{HttpCallbackSender, Simulator, SimulatorConfig};

#[derive(Parser)]
#[command(
    name = "veriscan-simulator",
    about = "Synthesizes signed callbacks for documents awaiting remote notifications"
)]
struct Cli {
    /// Tenant name to simulate callbacks for
    #[arg(long)]
    tenant: String,

    /// Log what would be delivered without sending anything
    #[arg(long)]
    dry_run: bool,

    /// Run exactly one cycle, then exit
    #[arg(long)]
    once: bool,

    /// Number of cycles to run (unlimited when omitted)
    #[arg(long)]
    cycles: Option<u64>,

    /// Maximum callbacks per cycle (defaults to SIMULATOR_CYCLE_CAP)
    #[arg(long)]
    cap: Option<usize>,

    /// Seconds between cycles (defaults to SIMULATOR_INTERVAL_SECONDS)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Gateway base URL (defaults to CALLBACK_BASE_URL)
    #[arg(long)]
    endpoint: Option<String>,
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "veriscan=info".into()))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let tenants = TenantRepository::new(pool.clone());
    let tenant = tenants
        .get_by_name(&cli.tenant)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .with_context(|| format!("Tenant '{}' not found", cli.tenant))?;

    // Fail fast before any cycle: these are configuration errors.
    Simulator::preflight(&config, &tenant).map_err(|e| anyhow::anyhow!(e))?;

    let endpoint = cli
        .endpoint
        .unwrap_or_else(|| config.callback_base_url.clone());
    if endpoint.is_empty() {
        anyhow::bail!("No gateway endpoint: set CALLBACK_BASE_URL or pass --endpoint");
    }

    let simulator_config = SimulatorConfig {
        dry_run: cli.dry_run,
        max_cycles: if cli.once { Some(1) } else { cli.cycles },
        cycle_cap: cli.cap.unwrap_or(config.simulator_cycle_cap).max(1),
        interval: Duration::from_secs(
            cli.interval_secs
                .unwrap_or(config.simulator_interval_seconds),
        ),
    };

    let sender = HttpCallbackSender::new(
        &endpoint,
        Duration::from_secs(config.remote_timeout_seconds),
    )?;
    let simulator = Simulator::new(
        tenant,
        Box::new(veriscan_db::DocumentRepository::new(pool)),
        Box::new(sender),
        simulator_config,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    simulator.run(shutdown).await.map_err(|e| anyhow::anyhow!(e))
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}
