//! # Airdropper - Perpetual Lottery and Asset-Cycling Bot
//!
//! Pays a fixed native-coin reward to a balance-weighted random account
//! every cycle, and keeps a scarce "oil" asset moving through
//! burn/free/airdrop transfers to simulate consumption.
//!
//! ## Modules
//!
//! - [`config`] - TOML configuration
//! - [`error`] - Typed error handling with thiserror
//! - [`ledger`] - Collaborator seam: types and the [`ledger::LedgerClient`] trait
//! - [`lottery`] - Balance-weighted winner selection
//! - [`oil`] - Oil asset and the output-split policy
//! - [`pending`] - Pending-transfer reconciliation with expiry rollback
//! - [`orchestrator`] - The cycle loop
//! - [`rpc`] - JSON-RPC + indexer implementation of the ledger seam

pub mod config;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod lottery;
pub mod oil;
pub mod orchestrator;
pub mod pending;
pub mod rpc;

pub use config::AirdropperConfig;
pub use error::{AirdropError, LedgerError};
pub use ledger::{Account, Address, Finality, LedgerClient, PayerInfo, TxHash};
pub use logger::setup_logger;
pub use lottery::CandidateSet;
pub use oil::{OilAsset, OutputSplitPolicy};
pub use orchestrator::{discover_oil, OilCycleOutcome, Orchestrator};
pub use pending::{PendingRecord, PendingTracker};
pub use rpc::HttpLedgerClient;
