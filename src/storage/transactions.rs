// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reconciled transaction records.
//!
//! Records are created by the reconciliation engine on first sighting of a
//! ledger signature and are append-mostly: after the first insert only
//! `status` (and `updated_at`) may change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::{lamports_to_sol, TransactionSummary};

/// Transaction category.
///
/// Defaults to `Other` unless classified by upstream enrichment; the
/// reconciliation engine never reclassifies an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxCategory {
    Send,
    Receive,
    Swap,
    NftMint,
    NftTransfer,
    Stake,
    Unstake,
    Other,
}

impl Default for TxCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl TxCategory {
    /// Parse a query-string filter value.
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "send" => Some(Self::Send),
            "receive" => Some(Self::Receive),
            "swap" => Some(Self::Swap),
            "nft_mint" => Some(Self::NftMint),
            "nft_transfer" => Some(Self::NftTransfer),
            "stake" => Some(Self::Stake),
            "unstake" => Some(Self::Unstake),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Swap => "swap",
            Self::NftMint => "nft_mint",
            Self::NftTransfer => "nft_transfer",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Other => "other",
        }
    }
}

/// Ledger confirmation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Observed in a block
    Confirmed,
    /// Rooted, will not be rolled back
    Finalized,
    /// Executed but failed on chain
    Failed,
}

impl TxStatus {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(Self::Confirmed),
            "finalized" => Some(Self::Finalized),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Stored transaction record, keyed by ledger signature.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredTransaction {
    /// Globally unique ledger signature (primary dedup key)
    pub signature: String,
    /// Canonical wallet key the record belongs to
    pub wallet_key: String,
    /// Classification, `other` unless enriched upstream
    #[serde(default)]
    pub category: TxCategory,
    /// Amount in SOL
    #[serde(default)]
    pub amount: f64,
    /// Fee paid in SOL (converted from lamports at first insert)
    #[serde(default)]
    pub fee: f64,
    /// Ledger block time
    pub block_time: DateTime<Utc>,
    /// Slot the transaction landed in
    pub slot: u64,
    /// Confirmation status
    pub status: TxStatus,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTransaction {
    /// Build a record from a fetched ledger summary.
    ///
    /// Fee is converted from lamports to SOL here; status is derived from
    /// the summary's error indicator.
    pub fn from_summary(wallet_key: &str, summary: &TransactionSummary) -> Self {
        let now = Utc::now();
        let status = if summary.err.is_some() {
            TxStatus::Failed
        } else {
            TxStatus::Confirmed
        };
        Self {
            signature: summary.signature.clone(),
            wallet_key: wallet_key.to_string(),
            category: TxCategory::Other,
            amount: 0.0,
            fee: lamports_to_sol(summary.fee_lamports),
            block_time: summary
                .block_time
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or(now),
            slot: summary.slot,
            status,
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of the signature
    Created,
    /// Signature was known and its status changed
    StatusUpdated,
    /// Signature was known with an identical status
    Unchanged,
}

/// Filters for transaction store queries.
#[derive(Debug, Clone, Default)]
pub struct TxFilter {
    pub category: Option<TxCategory>,
    pub status: Option<TxStatus>,
}

impl TxFilter {
    pub fn matches(&self, tx: &StoredTransaction) -> bool {
        if let Some(category) = self.category {
            if tx.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if tx.status != status {
                return false;
            }
        }
        true
    }
}

/// Aggregates derived from the transaction store for one wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WalletAggregates {
    pub transaction_count: u64,
    pub total_volume: f64,
    pub total_fees: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(signature: &str, err: Option<serde_json::Value>) -> TransactionSummary {
        TransactionSummary {
            signature: signature.to_string(),
            slot: 1234,
            block_time: Some(1_700_000_000),
            fee_lamports: 5_000,
            err,
        }
    }

    #[test]
    fn from_summary_converts_fee_and_derives_status() {
        let tx = StoredTransaction::from_summary("wallet", &summary("sig-1", None));
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert!((tx.fee - 0.000005).abs() < 1e-12);
        assert_eq!(tx.category, TxCategory::Other);
        assert_eq!(tx.block_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn from_summary_marks_failed_on_error_indicator() {
        let tx = StoredTransaction::from_summary(
            "wallet",
            &summary("sig-2", Some(serde_json::json!({"InstructionError": [0, "Custom"]}))),
        );
        assert_eq!(tx.status, TxStatus::Failed);
    }

    #[test]
    fn filter_matches_category_and_status() {
        let tx = StoredTransaction::from_summary("wallet", &summary("sig-3", None));

        assert!(TxFilter::default().matches(&tx));
        assert!(TxFilter {
            category: Some(TxCategory::Other),
            status: Some(TxStatus::Confirmed),
        }
        .matches(&tx));
        assert!(!TxFilter {
            category: Some(TxCategory::Swap),
            status: None,
        }
        .matches(&tx));
        assert!(!TxFilter {
            category: None,
            status: Some(TxStatus::Failed),
        }
        .matches(&tx));
    }

    #[test]
    fn category_round_trips_through_strings() {
        for category in [
            TxCategory::Send,
            TxCategory::Receive,
            TxCategory::Swap,
            TxCategory::NftMint,
            TxCategory::NftTransfer,
            TxCategory::Stake,
            TxCategory::Unstake,
            TxCategory::Other,
        ] {
            assert_eq!(TxCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(TxCategory::from_str("bogus"), None);
    }
}
