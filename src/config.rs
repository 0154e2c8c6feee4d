//! Configuration loader for the airdropper
//!
//! Settings live in a TOML file (see `config.toml.example`). Required keys
//! fail at startup; the oil section and the wrap recipient are optional and
//! disable the corresponding cycle steps when absent.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Default probability of skipping the oil transfer for a whole cycle.
///
/// Inherited constant; kept configurable rather than second-guessed.
pub const DEFAULT_OIL_SKIP_PROBABILITY: f64 = 0.1;

/// Default backlog length after which a still-pending oil transfer list is
/// declared expired and the working asset rolls back.
pub const DEFAULT_OIL_WAITING_LIMIT: usize = 10;

/// Default flat fee attached to every submitted transaction.
pub const DEFAULT_FEE: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct AirdropperConfig {
    /// Ledger node JSON-RPC endpoint
    pub rpc_url: String,
    /// Indexer base URL serving the account list and UTXO lookups
    pub indexer_url: String,
    /// Network identifier passed to the ledger client
    pub network_id: String,
    /// Fixed reward paid to each lottery winner, in the smallest coin unit
    pub reward: u64,
    /// Seconds slept between cycle steps; also the unit of the expiry limit
    pub drop_interval: u64,
    /// Flat transaction fee
    #[serde(default = "default_fee")]
    pub fee: u64,
    /// Accounts never selected as lottery winners
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Probability that an entire oil cycle is skipped (throttles backlog)
    #[serde(default = "default_oil_skip_probability")]
    pub oil_skip_probability: f64,
    /// Pending-queue length beyond which the oil transfer list is expired
    #[serde(default = "default_oil_waiting_limit")]
    pub oil_waiting_limit: usize,
    /// Whether the node distinguishes failed transactions from pending ones
    #[serde(default)]
    pub ledger_reports_failure: bool,
    /// Asset address receiving the wrap leg of the wrap/unwrap round-trip;
    /// omit to disable that step
    pub wrap_recipient: Option<String>,
    pub payer: PayerConfig,
    pub oil: Option<OilConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayerConfig {
    /// Platform address funding every reward and fee
    pub address: String,
    /// Keystore passphrase for the payer account
    pub passphrase: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OilConfig {
    /// Asset address owning the oil supply
    pub owner: String,
    /// Keystore passphrase unlocking the oil owner's key
    pub passphrase: String,
    /// Asset type of the minted oil
    pub asset_type: String,
    /// Shard holding the oil UTXO
    #[serde(default)]
    pub shard_id: u16,
}

fn default_fee() -> u64 {
    DEFAULT_FEE
}

fn default_oil_skip_probability() -> f64 {
    DEFAULT_OIL_SKIP_PROBABILITY
}

fn default_oil_waiting_limit() -> usize {
    DEFAULT_OIL_WAITING_LIMIT
}

impl AirdropperConfig {
    /// Load configuration from a TOML file
    pub fn from_path(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config from {}", path))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.oil_skip_probability),
            "oil_skip_probability must be within [0, 1], got {}",
            self.oil_skip_probability
        );
        anyhow::ensure!(self.drop_interval > 0, "drop_interval must be positive");
        anyhow::ensure!(!self.payer.address.is_empty(), "payer.address is empty");
        Ok(())
    }
}
