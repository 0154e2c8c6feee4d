//! Ledger collaborator seam
//!
//! The orchestration core never talks to the network directly. Everything
//! it needs from the outside world is behind [`LedgerClient`]: the account
//! list, sequence numbers, signing, submission and finality queries. The
//! production implementation is [`crate::rpc::HttpLedgerClient`]; tests use
//! an in-memory mock.
//!
//! Transactions are opaque to the core. It describes intent with
//! [`TransactionSpec`] and receives back a [`SignedTransaction`] blob plus,
//! after submission, a [`TxHash`]. Wire formats are the client's concern.

use crate::error::LedgerError;
use async_trait::async_trait;
use num_bigint::BigUint;
use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A platform or asset address on the ledger, in its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque transaction identifier returned by the ledger on submission.
///
/// Also used as the tracker reference for the transfer's output 0, which is
/// the only stable handle the core holds on the successor oil asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Asset type identifier assigned at mint time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetTypeId(pub String);

impl fmt::Display for AssetTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keystore passphrase. Opaque to the core, wiped on drop, never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(pub String);

impl Passphrase {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One entry of the account-listing service.
///
/// Balances are arbitrary precision; ledger amounts routinely exceed the
/// f64 safe-integer range.
#[derive(Debug, Clone)]
pub struct Account {
    pub address: Address,
    pub balance: BigUint,
}

/// Three-way finality signal for a submitted transaction.
///
/// Clients whose node cannot distinguish a dropped transaction from one
/// merely not yet included must report `Pending`; the tracker's backlog
/// threshold then drives expiry on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    Included,
    Pending,
    Failed,
}

/// Reference to a spendable transaction output holding an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOutPoint {
    pub tracker: TxHash,
    pub index: u64,
    pub asset_type: AssetTypeId,
    pub shard_id: u16,
    pub quantity: u64,
}

/// Where an asset-transfer output is locked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Regular ownership output to an asset address.
    Owner(Address),
    /// Output locked to the burn script; the quantity is destroyed.
    Burn,
    /// Output anyone can spend; the quantity is released unrestricted.
    Free,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutput {
    pub target: OutputTarget,
    pub asset_type: AssetTypeId,
    pub shard_id: u16,
    pub quantity: u64,
}

/// Intent description for every transaction kind the bot submits.
#[derive(Debug, Clone)]
pub enum TransactionSpec {
    /// Native-coin payment to a lottery winner.
    Pay { recipient: Address, quantity: u64 },
    /// Oil transfer spending one input into remainder/burn/free outputs.
    TransferAsset {
        input: AssetOutPoint,
        input_passphrase: Passphrase,
        outputs: Vec<TransferOutput>,
        /// Unix millisecond deadline after which the ledger drops the
        /// transaction instead of including it.
        expiration: u64,
    },
    /// Wrap native coin into its tradeable asset form.
    WrapCoin {
        shard_id: u16,
        recipient: Address,
        quantity: u64,
        payer: Address,
    },
    /// Burn the wrapped asset back into native coin.
    UnwrapCoin {
        wrap_tx: TxHash,
        quantity: u64,
        receiver: Address,
    },
    /// One-shot initial asset mint.
    MintAsset {
        metadata: String,
        supply: u64,
        recipient: Address,
        shard_id: u16,
    },
}

/// A signed transaction blob, ready for submission. Opaque to the core.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: String,
}

/// Everything the orchestration core needs from the outside world.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current (address, balance) pairs from the account-listing service.
    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Last confirmed sequence number of `account`.
    async fn get_seq(&self, account: &Address) -> Result<u64, LedgerError>;

    /// How many of `account`'s transactions are submitted but not yet
    /// included.
    async fn pending_transaction_count(&self, account: &Address) -> Result<u64, LedgerError>;

    /// Sign `spec` with `account`'s key at the given sequence and fee.
    async fn sign(
        &self,
        spec: &TransactionSpec,
        account: &Address,
        passphrase: &Passphrase,
        seq: u64,
        fee: u64,
    ) -> Result<SignedTransaction, LedgerError>;

    /// Submit a signed transaction, returning its identifier.
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, LedgerError>;

    /// Finality of a previously submitted transaction.
    async fn finality(&self, hash: &TxHash) -> Result<Finality, LedgerError>;

    /// Quantity currently held at the given output, if it exists.
    async fn get_asset(
        &self,
        tracker: &TxHash,
        index: u64,
        shard_id: u16,
    ) -> Result<Option<u64>, LedgerError>;

    /// Resolve the UTXO tracker currently holding `owner`'s asset of the
    /// given type, via the indexer.
    async fn find_asset_tracker(
        &self,
        owner: &Address,
        asset_type: &AssetTypeId,
    ) -> Result<TxHash, LedgerError>;
}

/// Next usable sequence number for `account`.
///
/// The confirmed sequence alone is wrong whenever earlier submissions are
/// still in the mempool; submitting with it collides and gets rejected.
pub async fn calculate_seq<C: LedgerClient + ?Sized>(
    client: &C,
    account: &Address,
) -> Result<u64, LedgerError> {
    let seq = client.get_seq(account).await?;
    let pending = client.pending_transaction_count(account).await?;
    Ok(seq + pending)
}

/// The account funding all rewards and fees, with its signing material.
#[derive(Debug, Clone)]
pub struct PayerInfo {
    pub address: Address,
    pub passphrase: Passphrase,
    pub fee: u64,
}

impl PayerInfo {
    pub fn new(address: Address, passphrase: Passphrase, fee: u64) -> Self {
        Self {
            address,
            passphrase,
            fee,
        }
    }

    /// Sign and submit `spec` from the payer account with a sequence
    /// number adjusted for in-flight submissions.
    pub async fn send<C: LedgerClient + ?Sized>(
        &self,
        client: &C,
        spec: &TransactionSpec,
    ) -> Result<TxHash, LedgerError> {
        let seq = calculate_seq(client, &self.address).await?;
        let signed = client
            .sign(spec, &self.address, &self.passphrase, seq, self.fee)
            .await?;
        client.submit(signed).await
    }
}
