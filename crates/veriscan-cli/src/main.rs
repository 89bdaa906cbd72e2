//! Veriscan CLI — webhook administration against a named tenant.
//!
//! Set DATABASE_URL, REMOTE_API_URL, REMOTE_API_KEY, and CALLBACK_BASE_URL.
//! Exit code is non-zero on any failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use serde::Serialize;

use veriscan_client::{check_reachability, ScanApiClient};
use veriscan_core::Config;
use veriscan_db::TenantRepository;

#[derive(Parser)]
#[command(name = "veriscan", about = "Veriscan webhook administration CLI")]
struct Cli {
    /// Tenant name to operate on
    #[arg(long)]
    tenant: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this deployment's callback endpoint with the remote service
    Register {
        /// Signing secret (hex); generated when omitted
        #[arg(long)]
        secret: Option<String>,
    },
    /// Update the existing registration in place (new URL and/or secret)
    Update {
        /// Rotate to a fresh signing secret
        #[arg(long)]
        rotate_secret: bool,
    },
    /// Check the registration: remote record exists and the endpoint is reachable
    Validate,
    /// List registrations known to the remote service
    List,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn callback_url(config: &Config, tenant_id: uuid::Uuid) -> String {
    format!(
        "{}/api/v0/callbacks/{}",
        config.callback_base_url.trim_end_matches('/'),
        tenant_id
    )
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "veriscan=info".into()))
        .with(tracing_subscriber::fmt::layer().compact().without_time())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    if config.callback_base_url.is_empty() {
        anyhow::bail!("CALLBACK_BASE_URL must be set");
    }

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let tenants = TenantRepository::new(pool);

    let tenant = tenants
        .get_by_name(&cli.tenant)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .with_context(|| format!("Tenant '{}' not found", cli.tenant))?;

    let client = ScanApiClient::new(
        &config.remote_api_url,
        &config.remote_api_key,
        config.remote_timeout_seconds,
    )?;

    match cli.command {
        Commands::Register { secret } => {
            if tenant.webhook_configured() {
                anyhow::bail!(
                    "Tenant '{}' already has a webhook registration; use `update`",
                    tenant.name
                );
            }
            let secret = secret.unwrap_or_else(generate_secret);
            let url = callback_url(&config, tenant.id);
            let webhook = client.register_webhook(&url, &secret).await?;
            let updated = tenants
                .set_webhook_registration(tenant.id, Some(&webhook.id), Some(&secret))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!(
                "Registered webhook {} for tenant '{}' at {}",
                webhook.id, updated.name, url
            );
        }
        Commands::Update { rotate_secret } => {
            let webhook_id = tenant
                .webhook_id
                .as_deref()
                .context("Tenant has no webhook registration; use `register`")?;
            let secret = if rotate_secret {
                generate_secret()
            } else {
                tenant
                    .webhook_signing_secret
                    .clone()
                    .context("Tenant has no signing secret; use `register`")?
            };
            let url = callback_url(&config, tenant.id);
            let webhook = client.update_webhook(webhook_id, &url, &secret).await?;
            tenants
                .set_webhook_registration(tenant.id, Some(&webhook.id), Some(&secret))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Updated webhook {} for tenant '{}'", webhook.id, tenant.name);
        }
        Commands::Validate => {
            let webhook_id = tenant
                .webhook_id
                .as_deref()
                .context("Tenant has no webhook registration")?;
            let webhook = client.get_webhook(webhook_id).await?;
            let reachable = check_reachability(&webhook.url).await?;
            print_json(&serde_json::json!({
                "webhookId": webhook.id,
                "url": webhook.url,
                "eventTypes": webhook.event_types,
                "reachable": reachable,
            }))?;
            if !reachable {
                anyhow::bail!("Callback endpoint {} is not reachable", webhook.url);
            }
        }
        Commands::List => {
            let webhooks = client.list_webhooks().await?;
            print_json(&webhooks)?;
        }
    }

    Ok(())
}
