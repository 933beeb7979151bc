// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana JSON-RPC client.
//!
//! Implements [`LedgerGateway`] over the cluster's HTTP JSON-RPC API. Only
//! read methods are used; this service never submits transactions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    AccountProbe, Balance, LedgerError, LedgerGateway, LedgerResult, NetworkStatus,
    SignatureProbe, TokenHolding, TransactionDetail, TransactionSummary,
};

/// SPL token program owner used for holdings lookups.
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Request timeout for RPC calls.
const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON-RPC client for a Solana cluster endpoint.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: Client,
    url: String,
}

impl SolanaRpcClient {
    /// Create a client for the given RPC endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
        }
    }

    /// Issue a single JSON-RPC call and unwrap the `result` field.
    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{method}: {e}")))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{method}: {e}")))?;

        if let Some(err) = payload.get("error") {
            return Err(LedgerError::Unavailable(format!("{method}: {err}")));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Fetch the fee for one signature via `getTransaction`.
    ///
    /// Returns `Ok(0)` when the node no longer has the transaction body;
    /// errors bubble up so the caller can drop the item.
    async fn fetch_fee(&self, signature: &str) -> LedgerResult<u64> {
        let result = self
            .call(
                "getTransaction",
                json!([signature, {"maxSupportedTransactionVersion": 0}]),
            )
            .await?;
        Ok(result
            .pointer("/meta/fee")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl LedgerGateway for SolanaRpcClient {
    async fn get_balance(&self, wallet_key: &str) -> LedgerResult<Balance> {
        let result = self.call("getBalance", json!([wallet_key])).await?;
        let lamports = result
            .pointer("/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| LedgerError::InvalidResponse("getBalance: missing value".into()))?;
        Ok(Balance::from_lamports(lamports))
    }

    async fn get_token_holdings(&self, wallet_key: &str) -> LedgerResult<Vec<TokenHolding>> {
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    wallet_key,
                    {"programId": TOKEN_PROGRAM_ID},
                    {"encoding": "jsonParsed"},
                ]),
            )
            .await?;

        let accounts = result
            .pointer("/value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let holdings = accounts
            .iter()
            .filter_map(|account| {
                let info = account.pointer("/account/data/parsed/info")?;
                Some(TokenHolding {
                    mint: info.get("mint")?.as_str()?.to_string(),
                    amount: info
                        .pointer("/tokenAmount/uiAmount")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                    decimals: info
                        .pointer("/tokenAmount/decimals")
                        .and_then(Value::as_u64)
                        .unwrap_or(0) as u8,
                })
            })
            .collect();

        Ok(holdings)
    }

    async fn get_recent_transaction_summaries(
        &self,
        wallet_key: &str,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        let result = self
            .call(
                "getSignaturesForAddress",
                json!([wallet_key, {"limit": limit}]),
            )
            .await?;

        let entries = result
            .as_array()
            .cloned()
            .ok_or_else(|| {
                LedgerError::InvalidResponse("getSignaturesForAddress: expected array".into())
            })?;

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(signature) = entry.get("signature").and_then(Value::as_str) else {
                continue;
            };

            // Per-item failure: skip the item, keep the batch going
            let fee_lamports = match self.fetch_fee(signature).await {
                Ok(fee) => fee,
                Err(e) => {
                    tracing::warn!(signature, error = %e, "Skipping transaction, detail fetch failed");
                    continue;
                }
            };

            summaries.push(TransactionSummary {
                signature: signature.to_string(),
                slot: entry.get("slot").and_then(Value::as_u64).unwrap_or(0),
                block_time: entry.get("blockTime").and_then(Value::as_i64),
                fee_lamports,
                err: entry.get("err").filter(|v| !v.is_null()).cloned(),
            });
        }

        Ok(summaries)
    }

    async fn get_transaction_detail(&self, signature: &str) -> LedgerResult<TransactionDetail> {
        let result = self
            .call(
                "getTransaction",
                json!([signature, {"maxSupportedTransactionVersion": 0}]),
            )
            .await?;

        if result.is_null() {
            return Err(LedgerError::NotFound(format!("Transaction {signature}")));
        }

        let err = result.pointer("/meta/err").filter(|v| !v.is_null()).cloned();
        let balances = |pointer: &str| -> Vec<u64> {
            result
                .pointer(pointer)
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(Value::as_u64).collect())
                .unwrap_or_default()
        };

        Ok(TransactionDetail {
            signature: signature.to_string(),
            slot: result.get("slot").and_then(Value::as_u64).unwrap_or(0),
            block_time: result.get("blockTime").and_then(Value::as_i64),
            fee_lamports: result
                .pointer("/meta/fee")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            success: err.is_none(),
            err,
            pre_balances: balances("/meta/preBalances"),
            post_balances: balances("/meta/postBalances"),
        })
    }

    async fn get_network_status(&self) -> LedgerResult<NetworkStatus> {
        let version = self.call("getVersion", json!([])).await?;
        let slot = self.call("getSlot", json!([])).await?;
        let epoch_info = self.call("getEpochInfo", json!([])).await?;

        Ok(NetworkStatus {
            version: version
                .get("solana-core")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            current_slot: slot.as_u64().unwrap_or(0),
            epoch: epoch_info.get("epoch").and_then(Value::as_u64).unwrap_or(0),
            slot_index: epoch_info
                .get("slotIndex")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            slots_in_epoch: epoch_info
                .get("slotsInEpoch")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
    }

    async fn probe_account(&self, wallet_key: &str) -> LedgerResult<AccountProbe> {
        let result = self.call("getAccountInfo", json!([wallet_key])).await?;
        match result.pointer("/value") {
            Some(Value::Null) | None => Ok(AccountProbe {
                exists: false,
                balance_sol: 0.0,
            }),
            Some(account) => {
                let lamports = account
                    .get("lamports")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Ok(AccountProbe {
                    exists: true,
                    balance_sol: super::lamports_to_sol(lamports),
                })
            }
        }
    }

    async fn get_signature_status(&self, signature: &str) -> LedgerResult<SignatureProbe> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature], {"searchTransactionHistory": true}]),
            )
            .await?;

        match result.pointer("/value/0") {
            Some(Value::Null) | None => Ok(SignatureProbe {
                exists: false,
                confirmed: false,
                finalized: false,
                err: None,
            }),
            Some(status) => {
                let confirmation = status
                    .get("confirmationStatus")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                Ok(SignatureProbe {
                    exists: true,
                    confirmed: confirmation == "confirmed" || confirmation == "finalized",
                    finalized: confirmation == "finalized",
                    err: status.get("err").filter(|v| !v.is_null()).cloned(),
                })
            }
        }
    }
}
