//! The airdrop cycle loop
//!
//! One sequential loop drives everything; no background work, no
//! concurrent submissions. Each cycle performs the native-coin airdrop, an
//! optional wrap/unwrap round-trip, and an optional oil transfer cycle,
//! with a fixed pause between steps. Every step is caught at its own
//! boundary so the loop survives partial failures indefinitely; only
//! cancellation stops it.
//!
//! Sequence correctness depends on this single-threadedness: the payer's
//! next sequence number is derived from confirmed-plus-pending counts,
//! which is only race-free while this process has at most one submission
//! in flight at a time.

use crate::config::AirdropperConfig;
use crate::error::{AirdropError, LedgerError};
use crate::ledger::{Address, Finality, LedgerClient, PayerInfo, TransactionSpec, TxHash};
use crate::lottery::choose_winner;
use crate::oil::{legs_to_outputs, remainder_quantity, OilAsset, OutputSplitPolicy};
use crate::pending::{PendingRecord, PendingTracker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Oil-side state owned exclusively by the loop.
#[derive(Debug)]
pub struct OilState {
    /// Asset the next transfer will spend.
    pub working: OilAsset,
    /// Rollback target; the newest state the ledger provably accepted.
    pub last_known_good: OilAsset,
    /// In-flight transfers awaiting finality.
    pub pending: PendingTracker,
}

impl OilState {
    pub fn new(asset: OilAsset, waiting_limit: usize) -> Self {
        Self {
            working: asset.clone(),
            last_known_good: asset,
            pending: PendingTracker::new(waiting_limit),
        }
    }
}

/// What the oil step did this cycle; mostly useful for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OilCycleOutcome {
    /// No oil asset is configured.
    Disabled,
    /// The random throttle skipped the whole step.
    Skipped,
    /// Transfer submitted and already confirmed by the immediate poll.
    Confirmed,
    /// Transfer submitted, still pending, queued for future cycles.
    Queued,
    /// Transfer submitted but reported failed; working asset rolled back.
    RolledBack,
}

pub struct Orchestrator<C: LedgerClient> {
    client: Arc<C>,
    config: AirdropperConfig,
    payer: PayerInfo,
    excluded: Vec<Address>,
    split_policy: OutputSplitPolicy,
    oil: Option<OilState>,
    rng: StdRng,
}

impl<C: LedgerClient> Orchestrator<C> {
    pub fn new(client: Arc<C>, config: AirdropperConfig, oil_asset: Option<OilAsset>) -> Self {
        Self::with_rng(client, config, oil_asset, StdRng::from_entropy())
    }

    /// Deterministic construction for tests.
    pub fn with_rng(
        client: Arc<C>,
        config: AirdropperConfig,
        oil_asset: Option<OilAsset>,
        rng: StdRng,
    ) -> Self {
        let payer = PayerInfo::new(
            Address(config.payer.address.clone()),
            crate::ledger::Passphrase(config.payer.passphrase.clone()),
            config.fee,
        );
        let excluded = config.exclude.iter().map(|s| Address(s.clone())).collect();
        let oil = oil_asset.map(|asset| OilState::new(asset, config.oil_waiting_limit));
        Self {
            client,
            config,
            payer,
            excluded,
            split_policy: OutputSplitPolicy::default(),
            oil,
            rng,
        }
    }

    pub fn oil_state(&self) -> Option<&OilState> {
        self.oil.as_ref()
    }

    fn drop_interval(&self) -> Duration {
        Duration::from_secs(self.config.drop_interval)
    }

    /// Run until cancelled. Step failures are logged and the loop
    /// continues after its usual pause.
    pub async fn run(&mut self, token: CancellationToken) -> anyhow::Result<()> {
        info!(
            "airdropper started: reward {} every {}s, {} excluded account(s), oil {}",
            self.config.reward,
            self.config.drop_interval,
            self.excluded.len(),
            if self.oil.is_some() { "enabled" } else { "disabled" },
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            if let Err(e) = self.airdrop_coin().await {
                error!("coin airdrop failed: {}", e);
            }
            if !pause(self.drop_interval(), &token).await {
                break;
            }

            if self.config.wrap_recipient.is_some() {
                if let Err(e) = self.wrap_unwrap_round_trip(&token).await {
                    error!("wrap/unwrap round-trip failed: {}", e);
                }
                if !pause(self.drop_interval(), &token).await {
                    break;
                }
            }

            match self.oil_cycle(&token).await {
                Ok(outcome) => debug!("oil cycle outcome: {:?}", outcome),
                Err(e) => {
                    error!("oil cycle failed: {}", e);
                    if !pause(self.drop_interval(), &token).await {
                        break;
                    }
                }
            }
        }

        info!("airdropper stopped");
        Ok(())
    }

    /// Step 1: pay the fixed reward to a balance-weighted lottery winner.
    pub async fn airdrop_coin(&mut self) -> Result<TxHash, AirdropError> {
        let winner = choose_winner(
            self.client.as_ref(),
            &self.payer.address,
            &self.excluded,
            &mut self.rng,
        )
        .await?;
        info!("{} has won the lottery!", winner);

        let spec = TransactionSpec::Pay {
            recipient: winner,
            quantity: self.config.reward,
        };
        let hash = self.payer.send(self.client.as_ref(), &spec).await?;
        info!("coin airdropped in transaction {}", hash);
        Ok(hash)
    }

    /// Step 2: wrap the reward amount into the asset form and immediately
    /// unwrap it back, each leg its own transaction.
    pub async fn wrap_unwrap_round_trip(
        &mut self,
        token: &CancellationToken,
    ) -> Result<(), AirdropError> {
        let recipient = self
            .config
            .wrap_recipient
            .as_deref()
            .map(Address::from)
            .expect("caller gates on wrap_recipient");

        let wrap = TransactionSpec::WrapCoin {
            shard_id: 0,
            recipient,
            quantity: self.config.reward,
            payer: self.payer.address.clone(),
        };
        let wrap_hash = self.payer.send(self.client.as_ref(), &wrap).await?;
        info!("coin wrapped in transaction {}", wrap_hash);

        if !pause(self.drop_interval(), token).await {
            return Ok(());
        }

        let unwrap = TransactionSpec::UnwrapCoin {
            wrap_tx: wrap_hash,
            quantity: self.config.reward,
            receiver: self.payer.address.clone(),
        };
        let unwrap_hash = self.payer.send(self.client.as_ref(), &unwrap).await?;
        info!("coin unwrapped in transaction {}", unwrap_hash);
        Ok(())
    }

    /// Step 3: reconcile pending oil transfers, then submit one more.
    pub async fn oil_cycle(
        &mut self,
        token: &CancellationToken,
    ) -> Result<OilCycleOutcome, AirdropError> {
        let drop_interval = self.drop_interval();
        let waiting_limit = self.config.oil_waiting_limit as u64;
        let skip_probability = self.config.oil_skip_probability;
        let policy = self.split_policy;

        let Some(oil) = self.oil.as_mut() else {
            return Ok(OilCycleOutcome::Disabled);
        };

        // Idle some cycles so the pending queue drains faster than it fills.
        if self.rng.gen_bool(skip_probability) {
            debug!("oil cycle skipped this round");
            return Ok(OilCycleOutcome::Skipped);
        }

        let reconciliation = oil
            .pending
            .reconcile(self.client.as_ref(), oil.last_known_good.clone())
            .await?;
        oil.last_known_good = reconciliation.last_known_good;
        if reconciliation.reset_asset {
            warn!(
                "pending oil transfers expired; rolling back to tracker {}",
                oil.last_known_good.tracker
            );
            oil.working = oil.last_known_good.clone();
        }

        let legs = policy.split(oil.working.quantity, &mut self.rng)?;
        let outputs = legs_to_outputs(&oil.working, &legs);
        let expiration = unix_millis_now() + drop_interval.as_millis() as u64 * waiting_limit;
        let spec = TransactionSpec::TransferAsset {
            input: oil.working.out_point(),
            input_passphrase: oil.working.passphrase.clone(),
            outputs,
            expiration,
        };

        let hash = self.payer.send(self.client.as_ref(), &spec).await?;
        let next = oil
            .working
            .successor(hash.clone(), remainder_quantity(&legs));
        info!("oil transaction {} has been sent", hash);
        info!(
            "oil is airdropped: {} => {}",
            oil.working.tracker, next.tracker
        );
        oil.working = next.clone();

        if !pause(drop_interval, token).await {
            // Shutting down; leave the transfer queued so a restart can
            // reconcile it.
            oil.pending.push(PendingRecord {
                tx_hash: hash,
                resulting_asset: next,
            });
            return Ok(OilCycleOutcome::Queued);
        }

        // Fast-path poll right after the pause.
        match self.client.finality(&hash).await? {
            Finality::Included => {
                oil.last_known_good = next;
                oil.pending.clear();
                Ok(OilCycleOutcome::Confirmed)
            }
            Finality::Pending => {
                oil.pending.push(PendingRecord {
                    tx_hash: hash,
                    resulting_asset: next,
                });
                Ok(OilCycleOutcome::Queued)
            }
            Finality::Failed => {
                warn!("oil transaction {} failed; rolling back", hash);
                oil.working = oil.last_known_good.clone();
                Ok(OilCycleOutcome::RolledBack)
            }
        }
    }
}

/// Resolve the configured oil asset's current UTXO through the indexer.
pub async fn discover_oil<C: LedgerClient + ?Sized>(
    client: &C,
    config: &AirdropperConfig,
) -> Result<Option<OilAsset>, LedgerError> {
    let Some(oil) = &config.oil else {
        return Ok(None);
    };

    let owner = Address(oil.owner.clone());
    let asset_type = crate::ledger::AssetTypeId(oil.asset_type.clone());
    let tracker = client.find_asset_tracker(&owner, &asset_type).await?;
    let quantity = client
        .get_asset(&tracker, 0, oil.shard_id)
        .await?
        .ok_or_else(|| LedgerError::AssetNotFound {
            tracker: tracker.to_string(),
        })?;

    info!(
        "oil asset found: tracker {}, quantity {}",
        tracker, quantity
    );
    Ok(Some(OilAsset {
        tracker,
        owner,
        passphrase: crate::ledger::Passphrase(oil.passphrase.clone()),
        quantity,
        asset_type,
        shard_id: oil.shard_id,
    }))
}

/// Sleep that loses to cancellation; returns false when cancelled.
async fn pause(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}
