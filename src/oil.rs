//! Oil asset and the output-split policy
//!
//! Every oil transfer spends the whole current asset into up to three legs:
//! a remainder back to the owner, a small randomized burn, and a small
//! randomized free-for-all output. The legs always sum exactly to the input
//! quantity, zero legs are elided (the ledger rejects zero-value outputs),
//! and the burn/free order is a coin flip per transfer.

use crate::error::AirdropError;
use crate::ledger::{
    Address, AssetOutPoint, AssetTypeId, OutputTarget, Passphrase, TransferOutput, TxHash,
};
use rand::Rng;

/// Cap on each randomized leg quantity.
pub const MAX_LEG_QUANTITY: u64 = 10;

/// The scarce tradeable asset cycled by the bot.
///
/// Owned exclusively by the orchestrator loop between cycles; only
/// successful or rolled-back transfer outcomes replace it.
#[derive(Debug, Clone)]
pub struct OilAsset {
    /// Transaction-output reference currently holding the asset.
    pub tracker: TxHash,
    pub owner: Address,
    pub passphrase: Passphrase,
    pub quantity: u64,
    pub asset_type: AssetTypeId,
    pub shard_id: u16,
}

impl OilAsset {
    /// The outpoint spent by the next transfer. Output 0 is always the
    /// owner remainder, so the working asset sits at index 0.
    pub fn out_point(&self) -> AssetOutPoint {
        AssetOutPoint {
            tracker: self.tracker.clone(),
            index: 0,
            asset_type: self.asset_type.clone(),
            shard_id: self.shard_id,
            quantity: self.quantity,
        }
    }

    /// The asset as it will exist once a transfer with the given remainder
    /// is accepted, held at output 0 of that transfer.
    pub fn successor(&self, tx_hash: TxHash, remainder: u64) -> OilAsset {
        OilAsset {
            tracker: tx_hash,
            owner: self.owner.clone(),
            passphrase: self.passphrase.clone(),
            quantity: remainder,
            asset_type: self.asset_type.clone(),
            shard_id: self.shard_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegKind {
    Remainder,
    Burn,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLeg {
    pub kind: LegKind,
    pub quantity: u64,
}

/// Splits an asset quantity into remainder/burn/free legs.
#[derive(Debug, Clone, Copy)]
pub struct OutputSplitPolicy {
    max_leg_quantity: u64,
}

impl Default for OutputSplitPolicy {
    fn default() -> Self {
        Self {
            max_leg_quantity: MAX_LEG_QUANTITY,
        }
    }
}

impl OutputSplitPolicy {
    /// `min(cap, floor(-ln(u)))` with `u` uniform in `[0, 1)`; heavily
    /// biased toward 0 and 1, never above the cap.
    fn random_leg_quantity<R: Rng>(&self, rng: &mut R) -> u64 {
        let u: f64 = rng.gen();
        let q = (-u.ln()).floor();
        if q >= self.max_leg_quantity as f64 {
            self.max_leg_quantity
        } else {
            q as u64
        }
    }

    /// Draw burn and free quantities and assemble the leg list.
    ///
    /// Fails with `InsufficientQuantity` when the two random legs together
    /// exceed the supply instead of producing a negative remainder.
    pub fn split<R: Rng>(&self, total: u64, rng: &mut R) -> Result<Vec<OutputLeg>, AirdropError> {
        let burn = self.random_leg_quantity(rng);
        let free = self.random_leg_quantity(rng);
        let burn_first = rng.gen_bool(0.5);
        assemble_legs(total, burn, free, burn_first)
    }
}

/// Leg assembly with fixed quantities: remainder first, then burn and free
/// in the requested order, zero legs dropped.
pub fn assemble_legs(
    total: u64,
    burn: u64,
    free: u64,
    burn_first: bool,
) -> Result<Vec<OutputLeg>, AirdropError> {
    let requested = burn
        .checked_add(free)
        .ok_or(AirdropError::InsufficientQuantity {
            available: total,
            requested: u64::MAX,
        })?;
    let remainder = total
        .checked_sub(requested)
        .ok_or(AirdropError::InsufficientQuantity {
            available: total,
            requested,
        })?;

    let ordered = if burn_first {
        [
            OutputLeg {
                kind: LegKind::Remainder,
                quantity: remainder,
            },
            OutputLeg {
                kind: LegKind::Burn,
                quantity: burn,
            },
            OutputLeg {
                kind: LegKind::Free,
                quantity: free,
            },
        ]
    } else {
        [
            OutputLeg {
                kind: LegKind::Remainder,
                quantity: remainder,
            },
            OutputLeg {
                kind: LegKind::Free,
                quantity: free,
            },
            OutputLeg {
                kind: LegKind::Burn,
                quantity: burn,
            },
        ]
    };

    Ok(ordered.into_iter().filter(|leg| leg.quantity > 0).collect())
}

/// Map legs to transaction outputs for the given asset.
pub fn legs_to_outputs(asset: &OilAsset, legs: &[OutputLeg]) -> Vec<TransferOutput> {
    legs.iter()
        .map(|leg| TransferOutput {
            target: match leg.kind {
                LegKind::Remainder => OutputTarget::Owner(asset.owner.clone()),
                LegKind::Burn => OutputTarget::Burn,
                LegKind::Free => OutputTarget::Free,
            },
            asset_type: asset.asset_type.clone(),
            shard_id: asset.shard_id,
            quantity: leg.quantity,
        })
        .collect()
}

/// Remainder quantity of an assembled leg list (0 when the leg was elided).
pub fn remainder_quantity(legs: &[OutputLeg]) -> u64 {
    legs.iter()
        .find(|leg| leg.kind == LegKind::Remainder)
        .map(|leg| leg.quantity)
        .unwrap_or(0)
}
