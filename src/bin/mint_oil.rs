//! One-shot initial oil mint.
//!
//! Mints the full oil supply to the configured owner and prints the
//! transaction hash the airdropper needs to start cycling it.

use airdropper::ledger::{Address, TransactionSpec};
use airdropper::{setup_logger, AirdropperConfig, HttpLedgerClient, PayerInfo};
use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

const OIL_SUPPLY: u64 = 10_000_000_000;

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
    let config = AirdropperConfig::from_path(&args.config)?;
    let oil = config
        .oil
        .as_ref()
        .context("an [oil] section is required to mint")?;

    let client = HttpLedgerClient::new(
        &config.rpc_url,
        &config.indexer_url,
        &config.network_id,
        config.ledger_reports_failure,
    )?;

    let metadata = serde_json::json!({
        "name": "petrol",
        "description": "A helicopter needs petrol",
    })
    .to_string();
    let spec = TransactionSpec::MintAsset {
        metadata,
        supply: OIL_SUPPLY,
        recipient: Address(oil.owner.clone()),
        shard_id: oil.shard_id,
    };

    let payer = PayerInfo::new(
        Address(config.payer.address.clone()),
        airdropper::ledger::Passphrase(config.payer.passphrase.clone()),
        config.fee,
    );
    let hash = payer.send(&client, &spec).await?;

    info!("oil minted in transaction {}", hash);
    info!("set oil.asset_type from this mint before starting the airdropper");
    Ok(())
}
