// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Everything here is constructed once at process start and injected into
//! request handlers by reference — no module-level singletons.

use std::sync::Arc;

use crate::api::rate_limit::RateLimiters;
use crate::auth::{ChallengeManager, SessionIssuer};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::ledger::LedgerGateway;
use crate::sync::ReconciliationEngine;
use crate::storage::WalletDatabase;

/// Default bound on cached entries.
const CACHE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<WalletDatabase>,
    pub cache: Arc<TtlCache>,
    pub ledger: Arc<dyn LedgerGateway>,
    pub sessions: Arc<SessionIssuer>,
    pub challenges: Arc<ChallengeManager>,
    pub reconciliation: Arc<ReconciliationEngine>,
    pub rate_limits: Arc<RateLimiters>,
}

impl AppState {
    pub fn new(config: Config, db: WalletDatabase, ledger: Arc<dyn LedgerGateway>) -> Self {
        let db = Arc::new(db);
        let cache = Arc::new(TtlCache::new(CACHE_CAPACITY));
        let sessions = Arc::new(SessionIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let challenges = Arc::new(ChallengeManager::new(db.clone()));
        let reconciliation = Arc::new(ReconciliationEngine::new(
            db.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let rate_limits = Arc::new(RateLimiters::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db,
            cache,
            ledger,
            sessions,
            challenges,
            reconciliation,
            rate_limits,
        }
    }

    /// State over a temp database and an unreachable ledger endpoint.
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use crate::ledger::SolanaRpcClient;

        let dir = tempfile::tempdir().unwrap();
        let db = WalletDatabase::open(&dir.path().join("test.redb")).unwrap();
        let ledger = Arc::new(SolanaRpcClient::new("http://127.0.0.1:1"));
        let state = Self::new(Config::for_tests(), db, ledger);
        (state, dir)
    }

    /// Same as [`AppState::for_tests`] but with a caller-supplied ledger.
    #[cfg(test)]
    pub fn for_tests_with_ledger(ledger: Arc<dyn LedgerGateway>) -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = WalletDatabase::open(&dir.path().join("test.redb")).unwrap();
        let state = Self::new(Config::for_tests(), db, ledger);
        (state, dir)
    }
}
