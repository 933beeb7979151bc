// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cache Layer
//!
//! TTL-bounded, read-through cache in front of ledger lookups and aggregate
//! queries. Entries are namespaced per wallet (`balance:`, `transactions:`,
//! `tokens:`, `profile:`) so a mutation can evict everything it made stale
//! with one [`TtlCache::invalidate_wallet`] call.
//!
//! The cache is constructed once at process start and injected through
//! [`crate::state::AppState`]; it is derived state with no authority — the
//! stores behind it are always the source of truth.
//!
//! Concurrency: the mutex guards only map operations and is never held
//! across an await. Concurrent callers racing on the same key during a miss
//! may each run the compute closure; the last write wins. That relaxation is
//! deliberate — no single-flight guarantee is provided.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Cache key builders, one per data class.
pub mod keys {
    /// Native balance of a wallet.
    pub fn balance(wallet_key: &str) -> String {
        format!("balance:{wallet_key}")
    }

    /// Live transaction history page of a wallet.
    pub fn transactions(wallet_key: &str) -> String {
        format!("transactions:{wallet_key}")
    }

    /// Token holdings of a wallet.
    pub fn tokens(wallet_key: &str) -> String {
        format!("tokens:{wallet_key}")
    }

    /// Profile projection of a wallet.
    pub fn profile(wallet_key: &str) -> String {
        format!("profile:{wallet_key}")
    }

    /// Cluster status (not wallet-scoped).
    pub const NETWORK_STATUS: &str = "network:status";
}

/// Cached entry: serialized payload + insertion timestamp + its own TTL.
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

/// In-process TTL cache with LRU eviction.
pub struct TtlCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlCache {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a value if present and not expired.
    ///
    /// A read after the entry's TTL has elapsed is a miss and evicts the
    /// entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().ok()?;
        if let Some(entry) = entries.get(key) {
            if entry.inserted_at.elapsed() < entry.ttl {
                if let Ok(value) = serde_json::from_value(entry.value.clone()) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key, "cache hit");
                    return Some(value);
                }
            }
            // Expired (or undecodable) — remove it
            entries.pop(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "cache miss");
        None
    }

    /// Store a value, replacing any prior entry and resetting its TTL.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key.to_string(),
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    /// Read-through: return the cached value or compute, store, and return.
    ///
    /// The compute future runs without the cache lock held.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            return Ok(hit);
        }
        let value = compute().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }

    /// Remove one entry. Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.pop(key).is_some())
            .unwrap_or(false)
    }

    /// Evict every namespaced entry scoped to a wallet.
    ///
    /// Must be called after any mutation that makes a cached read stale
    /// (e.g. after a sync or a profile update).
    pub fn invalidate_wallet(&self, wallet_key: &str) {
        let removed = [
            keys::balance(wallet_key),
            keys::transactions(wallet_key),
            keys::tokens(wallet_key),
            keys::profile(wallet_key),
        ]
        .iter()
        .filter(|key| self.remove(key))
        .count();
        tracing::debug!(wallet_key, removed, "invalidated wallet cache");
    }

    /// Drop every entry.
    pub fn flush(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        tracing::info!("cache flushed");
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss counters since process start.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
