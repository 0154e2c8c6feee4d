//! HTTP implementation of the ledger seam
//!
//! Two upstream services back the bot: the node's JSON-RPC endpoint
//! (sequence numbers, keystore signing, submission, finality, asset
//! lookups) and an indexer REST API (the account list with balances and
//! UTXO resolution). Signing happens node-side against its keystore; this
//! process never holds private keys, only passphrases.
//!
//! Finality mapping: `chain_containsTransaction` answers inclusion. When
//! the node also serves `chain_getErrorHint` (capability flag
//! `ledger_reports_failure`), a hint for an unincluded hash is reported as
//! `Failed`; otherwise everything unincluded is `Pending` and expiry is
//! driven purely by the tracker's backlog threshold.

use crate::error::LedgerError;
use crate::ledger::{
    Account, Address, AssetTypeId, Finality, LedgerClient, OutputTarget, Passphrase,
    SignedTransaction, TransactionSpec, TxHash,
};
use async_trait::async_trait;
use num_bigint::BigUint;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

pub struct HttpLedgerClient {
    http: Client,
    rpc_url: Url,
    indexer_url: Url,
    network_id: String,
    reports_failure: bool,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountItem {
    address: String,
    balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtxoItem {
    transaction_tracker: String,
}

impl HttpLedgerClient {
    pub fn new(
        rpc_url: &str,
        indexer_url: &str,
        network_id: &str,
        reports_failure: bool,
    ) -> Result<Self, LedgerError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| LedgerError::InvalidResponse {
                endpoint: raw.to_string(),
                reason: format!("invalid URL: {}", e),
            })
        };
        Ok(Self {
            http: Client::new(),
            rpc_url: parse(rpc_url)?,
            indexer_url: parse(indexer_url)?,
            network_id: network_id.to_string(),
            reports_failure,
        })
    }

    fn network_error(&self, endpoint: &Url, e: reqwest::Error) -> LedgerError {
        LedgerError::Network {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.network_error(&self.rpc_url, e))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| self.network_error(&self.rpc_url, e))?;

        if let Some(error) = parsed.error {
            return Err(LedgerError::InvalidResponse {
                endpoint: self.rpc_url.to_string(),
                reason: format!("{} error {}: {}", method, error.code, error.message),
            });
        }
        parsed.result.ok_or_else(|| LedgerError::InvalidResponse {
            endpoint: self.rpc_url.to_string(),
            reason: format!("{}: response had neither result nor error", method),
        })
    }

    fn indexer_endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.indexer_url
            .join(path)
            .map_err(|e| LedgerError::InvalidResponse {
                endpoint: self.indexer_url.to_string(),
                reason: format!("bad indexer path {}: {}", path, e),
            })
    }
}

/// Wire form of a transaction intent, as the node's signing endpoint
/// expects it.
fn spec_to_json(spec: &TransactionSpec, network_id: &str) -> Value {
    match spec {
        TransactionSpec::Pay {
            recipient,
            quantity,
        } => json!({
            "type": "pay",
            "networkId": network_id,
            "recipient": recipient.as_str(),
            "quantity": quantity,
        }),
        TransactionSpec::TransferAsset {
            input,
            input_passphrase,
            outputs,
            expiration,
        } => json!({
            "type": "transferAsset",
            "networkId": network_id,
            "input": {
                "tracker": input.tracker.0,
                "index": input.index,
                "assetType": input.asset_type.0,
                "shardId": input.shard_id,
                "quantity": input.quantity,
            },
            "inputPassphrase": input_passphrase.expose(),
            "outputs": outputs.iter().map(|output| {
                let target = match &output.target {
                    OutputTarget::Owner(address) => json!({ "owner": address.as_str() }),
                    OutputTarget::Burn => json!("burn"),
                    OutputTarget::Free => json!("free"),
                };
                json!({
                    "target": target,
                    "assetType": output.asset_type.0,
                    "shardId": output.shard_id,
                    "quantity": output.quantity,
                })
            }).collect::<Vec<_>>(),
            "expiration": expiration,
        }),
        TransactionSpec::WrapCoin {
            shard_id,
            recipient,
            quantity,
            payer,
        } => json!({
            "type": "wrapCoin",
            "networkId": network_id,
            "shardId": shard_id,
            "recipient": recipient.as_str(),
            "quantity": quantity,
            "payer": payer.as_str(),
        }),
        TransactionSpec::UnwrapCoin {
            wrap_tx,
            quantity,
            receiver,
        } => json!({
            "type": "unwrapCoin",
            "networkId": network_id,
            "wrapTransaction": wrap_tx.0,
            "quantity": quantity,
            "receiver": receiver.as_str(),
        }),
        TransactionSpec::MintAsset {
            metadata,
            supply,
            recipient,
            shard_id,
        } => json!({
            "type": "mintAsset",
            "networkId": network_id,
            "metadata": metadata,
            "supply": supply,
            "recipient": recipient.as_str(),
            "shardId": shard_id,
        }),
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let endpoint = self.indexer_endpoint("api/account")?;
        let items: Vec<AccountItem> = self
            .http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|e| self.network_error(&endpoint, e))?
            .json()
            .await
            .map_err(|e| self.network_error(&endpoint, e))?;

        items
            .into_iter()
            .map(|item| {
                let balance = BigUint::parse_bytes(item.balance.as_bytes(), 10).ok_or_else(
                    || LedgerError::InvalidResponse {
                        endpoint: endpoint.to_string(),
                        reason: format!("unparsable balance '{}'", item.balance),
                    },
                )?;
                Ok(Account {
                    address: Address(item.address),
                    balance,
                })
            })
            .collect()
    }

    async fn get_seq(&self, account: &Address) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call("chain_getSeq", json!([account.as_str()]))
            .await?;
        result.as_u64().ok_or_else(|| LedgerError::InvalidResponse {
            endpoint: self.rpc_url.to_string(),
            reason: format!("chain_getSeq returned non-integer: {}", result),
        })
    }

    async fn pending_transaction_count(&self, account: &Address) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call(
                "mempool_getPendingTransactionsCount",
                json!([account.as_str()]),
            )
            .await?;
        result.as_u64().ok_or_else(|| LedgerError::InvalidResponse {
            endpoint: self.rpc_url.to_string(),
            reason: format!("pending count was not an integer: {}", result),
        })
    }

    async fn sign(
        &self,
        spec: &TransactionSpec,
        account: &Address,
        passphrase: &Passphrase,
        seq: u64,
        fee: u64,
    ) -> Result<SignedTransaction, LedgerError> {
        let params = json!([
            spec_to_json(spec, &self.network_id),
            {
                "account": account.as_str(),
                "passphrase": passphrase.expose(),
                "seq": seq,
                "fee": fee,
            }
        ]);
        let result = self
            .rpc_call("account_signTransaction", params)
            .await
            .map_err(|e| LedgerError::Signing {
                account: account.to_string(),
                reason: e.to_string(),
            })?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::Signing {
                account: account.to_string(),
                reason: format!("signer returned non-string payload: {}", result),
            })?
            .to_string();
        Ok(SignedTransaction { raw })
    }

    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, LedgerError> {
        let result = self
            .rpc_call("mempool_sendSignedTransaction", json!([tx.raw]))
            .await
            .map_err(|e| LedgerError::Submission {
                reason: e.to_string(),
            })?;
        let hash = result.as_str().ok_or_else(|| LedgerError::Submission {
            reason: format!("submission returned non-string hash: {}", result),
        })?;
        Ok(TxHash(hash.to_string()))
    }

    async fn finality(&self, hash: &TxHash) -> Result<Finality, LedgerError> {
        let contained = self
            .rpc_call("chain_containsTransaction", json!([hash.0]))
            .await?;
        if contained.as_bool() == Some(true) {
            return Ok(Finality::Included);
        }
        if self.reports_failure {
            let hint = self
                .rpc_call("chain_getErrorHint", json!([hash.0]))
                .await?;
            if !hint.is_null() {
                return Ok(Finality::Failed);
            }
        }
        Ok(Finality::Pending)
    }

    async fn get_asset(
        &self,
        tracker: &TxHash,
        index: u64,
        shard_id: u16,
    ) -> Result<Option<u64>, LedgerError> {
        let result = self
            .rpc_call("chain_getAsset", json!([tracker.0, index, shard_id]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let quantity = result
            .get("quantity")
            .and_then(|q| q.as_str().and_then(|s| s.parse().ok()).or(q.as_u64()))
            .ok_or_else(|| LedgerError::InvalidResponse {
                endpoint: self.rpc_url.to_string(),
                reason: format!("asset without usable quantity: {}", result),
            })?;
        Ok(Some(quantity))
    }

    async fn find_asset_tracker(
        &self,
        owner: &Address,
        asset_type: &AssetTypeId,
    ) -> Result<TxHash, LedgerError> {
        let mut endpoint = self.indexer_endpoint("api/utxo")?;
        endpoint
            .query_pairs_mut()
            .append_pair("address", owner.as_str())
            .append_pair("assetType", &asset_type.0);

        let utxos: Vec<UtxoItem> = self
            .http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|e| self.network_error(&endpoint, e))?
            .json()
            .await
            .map_err(|e| self.network_error(&endpoint, e))?;

        utxos
            .into_iter()
            .next()
            .map(|utxo| TxHash(utxo.transaction_tracker))
            .ok_or(LedgerError::AssetNotFound {
                tracker: format!("{}:{}", owner, asset_type),
            })
    }
}
