// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Gateway
//!
//! Read-only abstraction over the Solana ledger: balances, token holdings,
//! transaction history, and network status. The gateway is consumed through
//! the [`LedgerGateway`] trait so the reconciliation engine and the API
//! handlers can be exercised against a stub in tests.
//!
//! The gateway does not retry internally; transient upstream failures map to
//! [`LedgerError::Unavailable`] and callers decide whether to retry.

pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use rpc::SolanaRpcClient;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert the ledger's smallest unit to its display unit.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Native balance of a wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    pub lamports: u64,
    pub sol: f64,
}

impl Balance {
    pub fn from_lamports(lamports: u64) -> Self {
        Self {
            lamports,
            sol: lamports_to_sol(lamports),
        }
    }
}

/// SPL token holding of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenHolding {
    /// Token mint address
    pub mint: String,
    /// Holding in the token's display unit
    pub amount: f64,
    pub decimals: u8,
}

/// Summary of one ledger transaction, as returned by the history listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionSummary {
    pub signature: String,
    pub slot: u64,
    /// Unix timestamp; absent for very old or unconfirmed entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    /// Fee in lamports
    pub fee_lamports: u64,
    /// Error indicator; present if and only if the transaction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<serde_json::Value>,
}

/// Full detail of one ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetail {
    pub signature: String,
    pub slot: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    pub fee_lamports: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<serde_json::Value>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
}

/// Cluster status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NetworkStatus {
    /// Node software version
    pub version: String,
    pub current_slot: u64,
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
}

/// Result of probing whether a wallet account exists on chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AccountProbe {
    pub exists: bool,
    pub balance_sol: f64,
}

/// Confirmation state of a single signature.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignatureProbe {
    pub exists: bool,
    pub confirmed: bool,
    pub finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<serde_json::Value>,
}

/// Ledger gateway failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Upstream transient failure; recoverable by caller retry
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered with something we cannot interpret
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Read API over the distributed ledger.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Native balance of a wallet.
    async fn get_balance(&self, wallet_key: &str) -> LedgerResult<Balance>;

    /// SPL token holdings of a wallet.
    async fn get_token_holdings(&self, wallet_key: &str) -> LedgerResult<Vec<TokenHolding>>;

    /// Up to `limit` most-recent transaction summaries for a wallet.
    ///
    /// A per-item detail fetch failure drops that item from the result; it
    /// must not abort the batch.
    async fn get_recent_transaction_summaries(
        &self,
        wallet_key: &str,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionSummary>>;

    /// Full detail for one signature.
    async fn get_transaction_detail(&self, signature: &str) -> LedgerResult<TransactionDetail>;

    /// Cluster status snapshot.
    async fn get_network_status(&self) -> LedgerResult<NetworkStatus>;

    /// Probe whether the wallet account exists on chain.
    async fn probe_account(&self, wallet_key: &str) -> LedgerResult<AccountProbe>;

    /// Confirmation state of a signature.
    async fn get_signature_status(&self, signature: &str) -> LedgerResult<SignatureProbe>;
}
