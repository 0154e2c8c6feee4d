//! # Error Types
//!
//! Centralized error definitions for the airdropper. Everything a single
//! cycle step can fail with is representable here; the orchestrator catches
//! these at each step boundary and keeps the loop alive.

use thiserror::Error;

/// Errors produced by the airdrop core itself.
#[derive(Error, Debug)]
pub enum AirdropError {
    /// No eligible lottery candidate remained after filtering the payer,
    /// the exclusion list and zero-balance accounts.
    #[error("no eligible candidate account remains")]
    EmptyCandidateSet,

    /// The randomized burn/free legs together exceed the asset supply.
    #[error("insufficient asset quantity: have {available}, legs need {requested}")]
    InsufficientQuantity { available: u64, requested: u64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors surfaced by the external ledger collaborator.
///
/// All variants are retryable from the orchestrator's point of view: the
/// affected step is logged and the loop proceeds to the next cycle.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("signing failed for '{account}': {reason}")]
    Signing { account: String, reason: String },

    #[error("transaction submission rejected: {reason}")]
    Submission { reason: String },

    #[error("network error talking to {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("asset not found for tracker {tracker}")]
    AssetNotFound { tracker: String },
}
