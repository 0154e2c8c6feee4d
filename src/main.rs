use airdropper::{discover_oil, setup_logger, AirdropperConfig, HttpLedgerClient, Orchestrator};
use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);
    let config = AirdropperConfig::from_path(&args.config)?;

    let client = Arc::new(HttpLedgerClient::new(
        &config.rpc_url,
        &config.indexer_url,
        &config.network_id,
        config.ledger_reports_failure,
    )?);

    let oil = discover_oil(client.as_ref(), &config)
        .await
        .context("failed to resolve the configured oil asset")?;

    let token = CancellationToken::new();
    let shutdown_token = token.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C. Initiating graceful shutdown...");
                shutdown_token.cancel();
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    let mut orchestrator = Orchestrator::new(client, config, oil);
    orchestrator.run(token).await
}
