//! Pending-transfer reconciliation
//!
//! Oil transfers may stay unconfirmed for many cycles. Each submitted
//! transfer is recorded with the asset state it would produce, in
//! submission order, and reconciled against finality queries once per
//! cycle:
//!
//! - the oldest record confirming pops it and advances the last known good
//!   asset, continuing down the queue within the same cycle;
//! - an explicitly failed oldest record, or a still-pending one behind a
//!   backlog longer than the waiting limit, expires the whole list: the
//!   queue is cleared and the caller must reset its working asset to the
//!   last known good state;
//! - otherwise reconciliation stops for this cycle and the queue is left
//!   in order.
//!
//! Finality resolves in submission order, which is what makes the FIFO
//! front the only record worth querying before older ones confirm.

use crate::error::LedgerError;
use crate::ledger::{Finality, LedgerClient, TxHash};
use crate::oil::OilAsset;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// One in-flight oil transfer and the asset state it produces once final.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub tx_hash: TxHash,
    pub resulting_asset: OilAsset,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The caller must roll its working asset back to `last_known_good`.
    pub reset_asset: bool,
    /// Most recent asset state known to be accepted by the ledger.
    pub last_known_good: OilAsset,
}

/// FIFO queue of in-flight oil transfers with expiration-based rollback.
#[derive(Debug)]
pub struct PendingTracker {
    queue: VecDeque<PendingRecord>,
    waiting_limit: usize,
}

impl PendingTracker {
    pub fn new(waiting_limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            waiting_limit,
        }
    }

    pub fn push(&mut self, record: PendingRecord) {
        self.queue.push_back(record);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Reconcile the queue against the ledger, front to back.
    ///
    /// Never treats a transport failure as a verdict: a failed finality
    /// query propagates as an error and leaves the queue untouched so the
    /// next cycle retries it.
    pub async fn reconcile<C: LedgerClient + ?Sized>(
        &mut self,
        client: &C,
        last_known_good: OilAsset,
    ) -> Result<Reconciliation, LedgerError> {
        let mut last_known_good = last_known_good;

        while let Some(front) = self.queue.front() {
            match client.finality(&front.tx_hash).await? {
                Finality::Included => {
                    debug!("oil transfer {} confirmed", front.tx_hash);
                    let record = self.queue.pop_front().expect("front exists");
                    last_known_good = record.resulting_asset;
                }
                Finality::Failed => {
                    warn!(
                        "oil transfer {} failed; expiring {} pending record(s)",
                        front.tx_hash,
                        self.queue.len()
                    );
                    self.queue.clear();
                    return Ok(Reconciliation {
                        reset_asset: true,
                        last_known_good,
                    });
                }
                Finality::Pending => {
                    if self.queue.len() > self.waiting_limit {
                        warn!(
                            "oil transfer backlog of {} exceeds waiting limit {}; expiring",
                            self.queue.len(),
                            self.waiting_limit
                        );
                        self.queue.clear();
                        return Ok(Reconciliation {
                            reset_asset: true,
                            last_known_good,
                        });
                    }
                    break;
                }
            }
        }

        Ok(Reconciliation {
            reset_asset: false,
            last_known_good,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::{
        Account, Address, AssetTypeId, Passphrase, SignedTransaction, TransactionSpec,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Finality oracle backed by a fixed map; unknown hashes are pending.
    /// Records how many queries were made.
    struct FinalityMap {
        map: HashMap<String, Finality>,
        queries: Mutex<Vec<String>>,
        fail_transport: bool,
    }

    impl FinalityMap {
        fn new(entries: &[(&str, Finality)]) -> Self {
            Self {
                map: entries
                    .iter()
                    .map(|(hash, finality)| (hash.to_string(), *finality))
                    .collect(),
                queries: Mutex::new(Vec::new()),
                fail_transport: false,
            }
        }

        fn broken() -> Self {
            Self {
                map: HashMap::new(),
                queries: Mutex::new(Vec::new()),
                fail_transport: true,
            }
        }
    }

    #[async_trait]
    impl LedgerClient for FinalityMap {
        async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn get_seq(&self, _: &Address) -> Result<u64, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn pending_transaction_count(&self, _: &Address) -> Result<u64, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn sign(
            &self,
            _: &TransactionSpec,
            _: &Address,
            _: &Passphrase,
            _: u64,
            _: u64,
        ) -> Result<SignedTransaction, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn submit(&self, _: SignedTransaction) -> Result<TxHash, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn finality(&self, hash: &TxHash) -> Result<Finality, LedgerError> {
            if self.fail_transport {
                return Err(LedgerError::Network {
                    endpoint: "mock".to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            self.queries.lock().unwrap().push(hash.0.clone());
            Ok(self.map.get(&hash.0).copied().unwrap_or(Finality::Pending))
        }
        async fn get_asset(&self, _: &TxHash, _: u64, _: u16) -> Result<Option<u64>, LedgerError> {
            unimplemented!("not used by the tracker")
        }
        async fn find_asset_tracker(
            &self,
            _: &Address,
            _: &AssetTypeId,
        ) -> Result<TxHash, LedgerError> {
            unimplemented!("not used by the tracker")
        }
    }

    fn asset(tracker: &str, quantity: u64) -> OilAsset {
        OilAsset {
            tracker: TxHash::from(tracker),
            owner: Address::from("oil-owner"),
            passphrase: Passphrase::from("secret"),
            quantity,
            asset_type: AssetTypeId("0xoil".to_string()),
            shard_id: 0,
        }
    }

    fn record(hash: &str, quantity: u64) -> PendingRecord {
        PendingRecord {
            tx_hash: TxHash::from(hash),
            resulting_asset: asset(hash, quantity),
        }
    }

    #[tokio::test]
    async fn empty_queue_is_a_noop() {
        let mut tracker = PendingTracker::new(10);
        let client = FinalityMap::new(&[]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();
        assert!(!result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("genesis"));
        assert!(client.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn included_front_pops_one_and_advances() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));
        tracker.push(record("tx2", 90));
        tracker.push(record("tx3", 85));

        let client = FinalityMap::new(&[("tx1", Finality::Included)]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(!result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("tx1"));
        assert_eq!(result.last_known_good.quantity, 95);
        assert_eq!(tracker.len(), 2);
    }

    #[tokio::test]
    async fn confirmations_cascade_within_one_cycle() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));
        tracker.push(record("tx2", 90));
        tracker.push(record("tx3", 85));

        let client = FinalityMap::new(&[
            ("tx1", Finality::Included),
            ("tx2", Finality::Included),
        ]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(!result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("tx2"));
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            *client.queries.lock().unwrap(),
            vec!["tx1".to_string(), "tx2".to_string(), "tx3".to_string()]
        );
    }

    #[tokio::test]
    async fn single_pending_record_below_limit_is_left_queued() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));

        let client = FinalityMap::new(&[]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(!result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("genesis"));
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn backlog_over_limit_expires_and_clears() {
        let mut tracker = PendingTracker::new(3);
        for i in 0..4 {
            tracker.push(record(&format!("tx{}", i), 100 - i));
        }

        let client = FinalityMap::new(&[]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("genesis"));
        assert!(tracker.is_empty());
        // Only the front is queried before the expiry decision.
        assert_eq!(client.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn backlog_exactly_at_limit_keeps_waiting() {
        let mut tracker = PendingTracker::new(3);
        for i in 0..3 {
            tracker.push(record(&format!("tx{}", i), 100 - i));
        }

        let client = FinalityMap::new(&[]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(!result.reset_asset);
        assert_eq!(tracker.len(), 3);
    }

    #[tokio::test]
    async fn failed_front_expires_immediately() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));
        tracker.push(record("tx2", 90));

        let client = FinalityMap::new(&[("tx1", Finality::Failed)]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        assert!(result.reset_asset);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn confirmed_prefix_then_failure_keeps_the_advance() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));
        tracker.push(record("tx2", 90));

        let client = FinalityMap::new(&[
            ("tx1", Finality::Included),
            ("tx2", Finality::Failed),
        ]);
        let result = tracker.reconcile(&client, asset("genesis", 100)).await.unwrap();

        // tx1 advanced last-known-good before tx2 triggered the rollback.
        assert!(result.reset_asset);
        assert_eq!(result.last_known_good.tracker, TxHash::from("tx1"));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_propagates_without_touching_the_queue() {
        let mut tracker = PendingTracker::new(10);
        tracker.push(record("tx1", 95));

        let client = FinalityMap::broken();
        let result = tracker.reconcile(&client, asset("genesis", 100)).await;

        assert!(matches!(result, Err(LedgerError::Network { .. })));
        assert_eq!(tracker.len(), 1);
    }
}
