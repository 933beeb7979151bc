// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity and transaction database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `identities`: wallet_key → serialized Identity
//! - `transactions`: signature → serialized StoredTransaction
//! - `wallet_tx_index`: composite key (wallet_key|!block_time|signature) → category
//!
//! redb serializes write transactions, so every conditional nonce update and
//! every upsert-by-signature is linearizable at the storage layer. No
//! application-level locking sits on top of this.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::identity::{Identity, ProfileUpdate, WalletKey};
use super::transactions::{StoredTransaction, TxFilter, UpsertOutcome, WalletAggregates};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: wallet_key → serialized Identity (JSON bytes).
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Primary table: signature → serialized StoredTransaction (JSON bytes).
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Index: composite key → category.
/// Key format: `wallet_key|!block_time_be|signature` for descending-time range scans.
const WALLET_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("wallet_tx_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the wallet_tx_index table.
///
/// Format: `wallet_key | inverted_timestamp_be_bytes | signature`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(wallet_key: &str, timestamp: i64, signature: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet_key.len() + 1 + 8 + 1 + signature.len());
    key.extend_from_slice(wallet_key.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(signature.as_bytes());
    key
}

/// Build a prefix key for range scanning all transactions of a wallet.
fn make_prefix(wallet_key: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(wallet_key.len() + 1);
    prefix.extend_from_slice(wallet_key.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with all 0xFF bytes appended).
fn make_prefix_end(wallet_key: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(wallet_key.len() + 1 + 20);
    end.extend_from_slice(wallet_key.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the signature portion from a composite index key.
fn extract_signature_from_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}

// =============================================================================
// WalletDatabase
// =============================================================================

/// Embedded ACID database for identities and reconciled transactions.
pub struct WalletDatabase {
    db: Database,
}

impl WalletDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Identities
    // =========================================================================

    /// Look up an identity by canonical wallet key.
    pub fn get_identity(&self, wallet_key: &str) -> StoreResult<Option<Identity>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IDENTITIES)?;
        match table.get(wallet_key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Assign a fresh nonce, creating the identity on first contact.
    ///
    /// Overwrites any previously issued, unconsumed nonce: at most one live
    /// challenge per identity. The whole load-modify-store runs in a single
    /// write transaction, so concurrent calls serialize and each caller gets
    /// back the internally consistent identity it wrote.
    pub fn create_or_rotate_nonce(
        &self,
        wallet_key: &WalletKey,
        nonce: String,
    ) -> StoreResult<Identity> {
        let write_txn = self.db.begin_write()?;
        let identity = {
            let mut table = write_txn.open_table(IDENTITIES)?;

            let mut identity = match table.get(wallet_key.as_str())? {
                Some(value) => {
                    let existing: Identity = serde_json::from_slice(value.value())?;
                    existing
                }
                None => Identity::new(wallet_key, nonce.clone()),
            };
            identity.nonce = Some(nonce);
            identity.updated_at = Utc::now();

            let json = serde_json::to_vec(&identity)?;
            table.insert(wallet_key.as_str(), json.as_slice())?;
            identity
        };
        write_txn.commit()?;
        Ok(identity)
    }

    /// Consume the live nonce if it matches `expected`.
    ///
    /// Compare-and-swap: the nonce is cleared and the login timestamp set in
    /// the same write transaction that checks it, so a given nonce verifies
    /// at most once even under concurrent replay of the same signature.
    /// Returns the updated identity on success, `None` if the nonce was
    /// already consumed, rotated away, or never existed.
    pub fn consume_nonce(
        &self,
        wallet_key: &str,
        expected: &str,
    ) -> StoreResult<Option<Identity>> {
        let write_txn = self.db.begin_write()?;
        let consumed = {
            let mut table = write_txn.open_table(IDENTITIES)?;

            let existing = match table.get(wallet_key)? {
                Some(value) => {
                    let identity: Identity = serde_json::from_slice(value.value())?;
                    Some(identity)
                }
                None => None,
            };

            match existing {
                Some(mut identity) if identity.nonce.as_deref() == Some(expected) => {
                    let now = Utc::now();
                    identity.nonce = None;
                    identity.last_login_at = Some(now);
                    identity.updated_at = now;

                    let json = serde_json::to_vec(&identity)?;
                    table.insert(wallet_key, json.as_slice())?;
                    Some(identity)
                }
                _ => None,
            }
        };
        write_txn.commit()?;
        Ok(consumed)
    }

    /// Apply a partial profile update.
    pub fn update_profile(
        &self,
        wallet_key: &str,
        update: ProfileUpdate,
    ) -> StoreResult<Identity> {
        let write_txn = self.db.begin_write()?;
        let identity = {
            let mut table = write_txn.open_table(IDENTITIES)?;

            let mut identity: Identity = match table.get(wallet_key)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => {
                    return Err(StoreError::NotFound(format!("Identity {wallet_key}")));
                }
            };

            update.apply(&mut identity.profile);
            identity.updated_at = Utc::now();

            let json = serde_json::to_vec(&identity)?;
            table.insert(wallet_key, json.as_slice())?;
            identity
        };
        write_txn.commit()?;
        Ok(identity)
    }

    /// Store derived aggregates on the identity record.
    pub fn set_aggregates(
        &self,
        wallet_key: &str,
        aggregates: WalletAggregates,
    ) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITIES)?;

            let existing = match table.get(wallet_key)? {
                Some(value) => {
                    let identity: Identity = serde_json::from_slice(value.value())?;
                    Some(identity)
                }
                None => None,
            };

            if let Some(mut identity) = existing {
                identity.transaction_count = aggregates.transaction_count;
                identity.total_volume = aggregates.total_volume;
                identity.total_fees = aggregates.total_fees;
                identity.updated_at = Utc::now();

                let json = serde_json::to_vec(&identity)?;
                table.insert(wallet_key, json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert or update a transaction by signature.
    ///
    /// First sighting inserts the record and its index entry. A repeat
    /// sighting updates `status` only (never amount, category, or any other
    /// field); an identical status is a no-op. The read and the write share
    /// one transaction, so two concurrent syncs racing on the same signature
    /// resolve to exactly one stored record — the signature key is the
    /// correctness mechanism, not caller-side locking.
    pub fn upsert_transaction(&self, tx: &StoredTransaction) -> StoreResult<UpsertOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut tx_table = write_txn.open_table(TRANSACTIONS)?;

            let existing = match tx_table.get(tx.signature.as_str())? {
                Some(value) => {
                    let stored: StoredTransaction = serde_json::from_slice(value.value())?;
                    Some(stored)
                }
                None => None,
            };

            match existing {
                None => {
                    let json = serde_json::to_vec(tx)?;
                    tx_table.insert(tx.signature.as_str(), json.as_slice())?;

                    let mut idx_table = write_txn.open_table(WALLET_TX_INDEX)?;
                    let key = make_index_key(
                        &tx.wallet_key,
                        tx.block_time.timestamp(),
                        &tx.signature,
                    );
                    idx_table.insert(key.as_slice(), tx.category.as_str())?;
                    UpsertOutcome::Created
                }
                Some(mut stored) if stored.status != tx.status => {
                    stored.status = tx.status;
                    stored.updated_at = Utc::now();
                    let json = serde_json::to_vec(&stored)?;
                    tx_table.insert(tx.signature.as_str(), json.as_slice())?;
                    UpsertOutcome::StatusUpdated
                }
                Some(_) => UpsertOutcome::Unchanged,
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Look up a single transaction by signature.
    pub fn get_transaction(&self, signature: &str) -> StoreResult<Option<StoredTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        match table.get(signature)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Paginated, filtered listing for a wallet, newest first.
    ///
    /// Returns `(page_of_transactions, total_matching)`.
    pub fn list_by_wallet(
        &self,
        wallet_key: &str,
        filter: &TxFilter,
        page: usize,
        limit: usize,
    ) -> StoreResult<(Vec<StoredTransaction>, usize)> {
        let skip = page.saturating_sub(1) * limit;

        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(WALLET_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(wallet_key);
        let prefix_end = make_prefix_end(wallet_key);

        let mut total = 0usize;
        let mut results = Vec::with_capacity(limit.min(128));

        for entry in idx_table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let key_bytes = entry.0.value();

            let Some(signature) = extract_signature_from_key(key_bytes) else {
                continue;
            };
            let Some(value) = tx_table.get(signature.as_str())? else {
                continue;
            };
            let tx: StoredTransaction = serde_json::from_slice(value.value())?;

            if !filter.matches(&tx) {
                continue;
            }

            if total >= skip && results.len() < limit {
                results.push(tx);
            }
            total += 1;
        }

        Ok((results, total))
    }

    /// Derive aggregates for a wallet by scanning its reconciled records.
    ///
    /// Used instead of a running counter: a crash between upserts and the
    /// aggregate write leaves the counter stale but never ahead of the rows
    /// that actually exist.
    pub fn wallet_aggregates(&self, wallet_key: &str) -> StoreResult<WalletAggregates> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(WALLET_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(wallet_key);
        let prefix_end = make_prefix_end(wallet_key);

        let mut aggregates = WalletAggregates::default();
        for entry in idx_table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let Some(signature) = extract_signature_from_key(entry.0.value()) else {
                continue;
            };
            let Some(value) = tx_table.get(signature.as_str())? else {
                continue;
            };
            let tx: StoredTransaction = serde_json::from_slice(value.value())?;
            aggregates.transaction_count += 1;
            aggregates.total_volume += tx.amount;
            aggregates.total_fees += tx.fee;
        }

        Ok(aggregates)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionSummary;
    use crate::storage::identity::Preferences;
    use crate::storage::transactions::{TxCategory, TxStatus};

    fn temp_db() -> (WalletDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = WalletDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn wallet() -> WalletKey {
        WalletKey::parse(&bs58::encode([9u8; 32]).into_string()).unwrap()
    }

    fn sample_tx(wallet_key: &str, signature: &str, block_time: i64) -> StoredTransaction {
        StoredTransaction::from_summary(
            wallet_key,
            &TransactionSummary {
                signature: signature.to_string(),
                slot: 100,
                block_time: Some(block_time),
                fee_lamports: 5_000,
                err: None,
            },
        )
    }

    #[test]
    fn rotate_nonce_creates_identity_lazily() {
        let (db, _dir) = temp_db();
        let key = wallet();

        assert!(db.get_identity(key.as_str()).unwrap().is_none());

        let identity = db
            .create_or_rotate_nonce(&key, "nonce-1".to_string())
            .unwrap();
        assert_eq!(identity.nonce.as_deref(), Some("nonce-1"));

        let loaded = db.get_identity(key.as_str()).unwrap().unwrap();
        assert_eq!(loaded.nonce.as_deref(), Some("nonce-1"));
    }

    #[test]
    fn rotate_nonce_overwrites_previous_challenge() {
        let (db, _dir) = temp_db();
        let key = wallet();

        db.create_or_rotate_nonce(&key, "nonce-1".to_string()).unwrap();
        db.create_or_rotate_nonce(&key, "nonce-2".to_string()).unwrap();

        // The first nonce is no longer consumable
        assert!(db.consume_nonce(key.as_str(), "nonce-1").unwrap().is_none());
        assert!(db.consume_nonce(key.as_str(), "nonce-2").unwrap().is_some());
    }

    #[test]
    fn consume_nonce_is_single_use() {
        let (db, _dir) = temp_db();
        let key = wallet();

        db.create_or_rotate_nonce(&key, "nonce-1".to_string()).unwrap();

        let first = db.consume_nonce(key.as_str(), "nonce-1").unwrap();
        assert!(first.is_some());
        assert!(first.unwrap().last_login_at.is_some());

        // Replay fails: the nonce is gone
        assert!(db.consume_nonce(key.as_str(), "nonce-1").unwrap().is_none());
    }

    #[test]
    fn consume_nonce_unknown_wallet_fails() {
        let (db, _dir) = temp_db();
        assert!(db.consume_nonce(wallet().as_str(), "whatever").unwrap().is_none());
    }

    #[test]
    fn update_profile_preserves_unset_fields() {
        let (db, _dir) = temp_db();
        let key = wallet();
        db.create_or_rotate_nonce(&key, "n".to_string()).unwrap();

        db.update_profile(
            key.as_str(),
            ProfileUpdate {
                username: Some("alice".to_string()),
                bio: Some("hello".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

        let updated = db
            .update_profile(
                key.as_str(),
                ProfileUpdate {
                    preferences: Some(Preferences::default()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.profile.username.as_deref(), Some("alice"));
        assert_eq!(updated.profile.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn update_profile_unknown_wallet_is_not_found() {
        let (db, _dir) = temp_db();
        let err = db
            .update_profile(wallet().as_str(), ProfileUpdate::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn upsert_creates_then_updates_status_only() {
        let (db, _dir) = temp_db();
        let key = wallet();

        let tx = sample_tx(key.as_str(), "sig-a", 1_700_000_000);
        assert_eq!(db.upsert_transaction(&tx).unwrap(), UpsertOutcome::Created);

        // Same signature, same status: no-op
        assert_eq!(db.upsert_transaction(&tx).unwrap(), UpsertOutcome::Unchanged);

        // Same signature, new status: only status changes
        let mut finalized = tx.clone();
        finalized.status = TxStatus::Finalized;
        finalized.amount = 99.0; // must NOT be applied
        assert_eq!(
            db.upsert_transaction(&finalized).unwrap(),
            UpsertOutcome::StatusUpdated
        );

        let stored = db.get_transaction("sig-a").unwrap().unwrap();
        assert_eq!(stored.status, TxStatus::Finalized);
        assert_eq!(stored.amount, 0.0);

        // Still exactly one record
        let (page, total) = db
            .list_by_wallet(key.as_str(), &TxFilter::default(), 1, 10)
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn list_by_wallet_orders_newest_first_and_paginates() {
        let (db, _dir) = temp_db();
        let key = wallet();

        for i in 0..5i64 {
            let tx = sample_tx(key.as_str(), &format!("sig-{i}"), 1_700_000_000 + i);
            db.upsert_transaction(&tx).unwrap();
        }

        let (page1, total) = db
            .list_by_wallet(key.as_str(), &TxFilter::default(), 1, 2)
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].signature, "sig-4"); // newest first
        assert_eq!(page1[1].signature, "sig-3");

        let (page3, _) = db
            .list_by_wallet(key.as_str(), &TxFilter::default(), 3, 2)
            .unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].signature, "sig-0");
    }

    #[test]
    fn list_by_wallet_applies_filters() {
        let (db, _dir) = temp_db();
        let key = wallet();

        let ok = sample_tx(key.as_str(), "sig-ok", 1_700_000_000);
        db.upsert_transaction(&ok).unwrap();

        let mut failed = sample_tx(key.as_str(), "sig-bad", 1_700_000_001);
        failed.status = TxStatus::Failed;
        db.upsert_transaction(&failed).unwrap();

        let (only_failed, total) = db
            .list_by_wallet(
                key.as_str(),
                &TxFilter {
                    status: Some(TxStatus::Failed),
                    category: None,
                },
                1,
                10,
            )
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(only_failed[0].signature, "sig-bad");

        let (by_category, _) = db
            .list_by_wallet(
                key.as_str(),
                &TxFilter {
                    category: Some(TxCategory::Swap),
                    status: None,
                },
                1,
                10,
            )
            .unwrap();
        assert!(by_category.is_empty());
    }

    #[test]
    fn aggregates_derive_from_stored_rows() {
        let (db, _dir) = temp_db();
        let key = wallet();

        for i in 0..3i64 {
            let mut tx = sample_tx(key.as_str(), &format!("sig-{i}"), 1_700_000_000 + i);
            tx.amount = 2.0;
            db.upsert_transaction(&tx).unwrap();
        }

        let aggregates = db.wallet_aggregates(key.as_str()).unwrap();
        assert_eq!(aggregates.transaction_count, 3);
        assert!((aggregates.total_volume - 6.0).abs() < 1e-9);
        assert!((aggregates.total_fees - 0.000015).abs() < 1e-12);

        db.create_or_rotate_nonce(&key, "n".to_string()).unwrap();
        db.set_aggregates(key.as_str(), aggregates).unwrap();
        let identity = db.get_identity(key.as_str()).unwrap().unwrap();
        assert_eq!(identity.transaction_count, 3);
    }

    #[test]
    fn index_keys_order_newest_first() {
        let key_old = make_index_key("wallet", 1000, "sig-1");
        let key_new = make_index_key("wallet", 2000, "sig-2");
        assert!(key_new < key_old, "newer timestamps must sort first");
    }

    #[test]
    fn transactions_are_isolated_per_wallet() {
        let (db, _dir) = temp_db();
        let key_a = wallet();
        let key_b = WalletKey::parse(&bs58::encode([3u8; 32]).into_string()).unwrap();

        db.upsert_transaction(&sample_tx(key_a.as_str(), "sig-a", 1_700_000_000))
            .unwrap();
        db.upsert_transaction(&sample_tx(key_b.as_str(), "sig-b", 1_700_000_000))
            .unwrap();

        let (for_a, total_a) = db
            .list_by_wallet(key_a.as_str(), &TxFilter::default(), 1, 10)
            .unwrap();
        assert_eq!(total_a, 1);
        assert_eq!(for_a[0].signature, "sig-a");
    }
}
