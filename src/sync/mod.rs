// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Reconciliation Engine
//!
//! Fetches recent ledger transactions for a wallet and idempotently merges
//! them into the transaction store.
//!
//! ## Crash safety
//!
//! Each upsert commits in its own storage transaction; no multi-row
//! transaction spans the batch. Identity aggregates are derived from a store
//! query after the batch rather than incremented, so an interrupted sync
//! leaves committed rows and a stale counter that the next run converges —
//! the counter can never exceed the rows that actually exist.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::TtlCache;
use crate::ledger::{LedgerError, LedgerGateway};
use crate::storage::{StoreError, StoredTransaction, UpsertOutcome, WalletDatabase};

/// Counts reported by one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncOutcome {
    /// Summaries successfully fetched from the ledger
    pub fetched: usize,
    /// Records created on first sighting
    pub created: usize,
    /// Records whose status changed
    pub updated: usize,
}

/// Reconciliation failure.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Merges ledger history into the transaction store.
pub struct ReconciliationEngine {
    db: Arc<WalletDatabase>,
    ledger: Arc<dyn LedgerGateway>,
    cache: Arc<TtlCache>,
}

impl ReconciliationEngine {
    pub fn new(
        db: Arc<WalletDatabase>,
        ledger: Arc<dyn LedgerGateway>,
        cache: Arc<TtlCache>,
    ) -> Self {
        Self { db, ledger, cache }
    }

    /// Fetch up to `limit` recent transactions and upsert them by signature.
    ///
    /// Running twice against unchanged ledger state creates nothing the
    /// second time and leaves the store byte-identical. Per-item fetch
    /// failures were already dropped by the gateway and are simply absent
    /// from `fetched`.
    pub async fn sync(&self, wallet_key: &str, limit: usize) -> Result<SyncOutcome, SyncError> {
        let summaries = self
            .ledger
            .get_recent_transaction_summaries(wallet_key, limit)
            .await?;

        let mut outcome = SyncOutcome {
            fetched: summaries.len(),
            ..SyncOutcome::default()
        };

        for summary in &summaries {
            let tx = StoredTransaction::from_summary(wallet_key, summary);
            match self.db.upsert_transaction(&tx)? {
                UpsertOutcome::Created => outcome.created += 1,
                UpsertOutcome::StatusUpdated => outcome.updated += 1,
                UpsertOutcome::Unchanged => {}
            }
        }

        // Derive aggregates from what is actually stored
        let aggregates = self.db.wallet_aggregates(wallet_key)?;
        self.db.set_aggregates(wallet_key, aggregates)?;

        // Cached reads for this wallet are now stale
        self.cache.invalidate_wallet(wallet_key);

        tracing::info!(
            wallet = wallet_key,
            fetched = outcome.fetched,
            created = outcome.created,
            updated = outcome.updated,
            "sync complete"
        );

        Ok(outcome)
    }
}
