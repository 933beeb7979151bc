// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Durable Storage
//!
//! Identities and reconciled transactions live in an embedded redb database
//! (pure Rust, ACID). The database is the single source of truth; the cache
//! layer in front of it is derived state with no authority.
//!
//! ## Layout
//!
//! ```text
//! {DATA_DIR}/wallet.redb
//!   identities        wallet_key → Identity
//!   transactions      signature  → StoredTransaction
//!   wallet_tx_index   wallet_key|!block_time|signature → category
//! ```

pub mod database;
pub mod identity;
pub mod transactions;

pub use database::{StoreError, StoreResult, WalletDatabase};
pub use identity::{Identity, Preferences, Profile, ProfileUpdate, Theme, WalletKey};
pub use transactions::{
    StoredTransaction, TxCategory, TxFilter, TxStatus, UpsertOutcome, WalletAggregates,
};
