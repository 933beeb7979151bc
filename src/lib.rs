// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana Wallet Server - Wallet Identity & Transaction History Service
//!
//! A client proves ownership of an ed25519 keypair by signing a server-issued
//! one-time challenge; the server then mints JWT session credentials and
//! reconciles the wallet's on-chain transaction history into an embedded
//! database, fronted by a TTL cache.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Challenge-response authentication and JWT sessions
//! - `cache` - TTL-bounded read-through cache
//! - `ledger` - Solana JSON-RPC gateway
//! - `storage` - Embedded identity/transaction database (redb)
//! - `sync` - Idempotent transaction reconciliation

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod state;
pub mod storage;
pub mod sync;
