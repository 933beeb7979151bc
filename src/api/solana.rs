// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger-facing endpoints: balances, token holdings, live history, network
//! status, wallet validation, and transaction sync.
//!
//! Ledger reads go through the cache layer with per-data-class TTLs;
//! `POST /api/solana/sync` runs the reconciliation engine and invalidates
//! the wallet's cached reads.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    cache::keys,
    error::ApiError,
    ledger::{
        AccountProbe, Balance, NetworkStatus, SignatureProbe, TokenHolding, TransactionDetail,
        TransactionSummary,
    },
    models::ApiResponse,
    state::AppState,
    storage::WalletKey,
    sync::SyncOutcome,
};

/// Default history page size, and the only page size that is cached.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Default sync batch size.
const DEFAULT_SYNC_LIMIT: usize = 50;

/// Upper bound for caller-supplied limits.
const MAX_LIMIT: usize = 100;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Balance payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceData {
    pub wallet_key: String,
    #[serde(flatten)]
    pub balance: Balance,
}

/// Token holdings payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokensData {
    pub wallet_key: String,
    pub tokens: Vec<TokenHolding>,
    pub count: usize,
}

/// Live transaction history payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryData {
    pub wallet_key: String,
    pub transactions: Vec<TransactionSummary>,
    pub count: usize,
}

/// Wallet validation payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateData {
    pub wallet_key: String,
    pub valid: bool,
    pub exists: bool,
    pub balance: f64,
}

/// Signature verification payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyTransactionData {
    pub signature: String,
    pub verification: SignatureProbe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TransactionDetail>,
}

/// Limit query for history and sync.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LimitQuery {
    /// Maximum number of items to fetch
    pub limit: Option<usize>,
}

// =============================================================================
// Handlers
// =============================================================================

fn parse_wallet(raw: &str) -> Result<WalletKey, ApiError> {
    WalletKey::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid Solana wallet address"))
}

/// Native balance (cached, fast-refresh TTL).
#[utoipa::path(
    get,
    path = "/api/solana/balance/{wallet_key}",
    tag = "Solana",
    params(("wallet_key" = String, Path, description = "Base58 wallet public key")),
    responses(
        (status = 200, description = "Balance"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
) -> Result<Json<ApiResponse<BalanceData>>, ApiError> {
    let key = parse_wallet(&wallet_key)?;
    let ttl = state.config.cache_ttls.balance;

    let data = state
        .cache
        .get_or_compute(&keys::balance(key.as_str()), ttl, || async {
            let balance = state.ledger.get_balance(key.as_str()).await?;
            Ok::<_, ApiError>(BalanceData {
                wallet_key: key.as_str().to_string(),
                balance,
            })
        })
        .await?;

    Ok(Json(ApiResponse::ok(data)))
}

/// SPL token holdings (cached).
#[utoipa::path(
    get,
    path = "/api/solana/tokens/{wallet_key}",
    tag = "Solana",
    params(("wallet_key" = String, Path, description = "Base58 wallet public key")),
    responses(
        (status = 200, description = "Token holdings"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn get_tokens(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
) -> Result<Json<ApiResponse<TokensData>>, ApiError> {
    let key = parse_wallet(&wallet_key)?;
    let ttl = state.config.cache_ttls.balance;

    let data = state
        .cache
        .get_or_compute(&keys::tokens(key.as_str()), ttl, || async {
            let tokens = state.ledger.get_token_holdings(key.as_str()).await?;
            Ok::<_, ApiError>(TokensData {
                wallet_key: key.as_str().to_string(),
                count: tokens.len(),
                tokens,
            })
        })
        .await?;

    Ok(Json(ApiResponse::ok(data)))
}

/// Live transaction history straight from the ledger.
///
/// Only the default page size is cached, mirroring the dominant lookup
/// pattern; explicit limits always hit the ledger.
#[utoipa::path(
    get,
    path = "/api/solana/transactions/{wallet_key}",
    tag = "Solana",
    params(
        ("wallet_key" = String, Path, description = "Base58 wallet public key"),
        LimitQuery
    ),
    responses(
        (status = 200, description = "Recent transactions"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<HistoryData>>, ApiError> {
    let key = parse_wallet(&wallet_key)?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_LIMIT);

    let fetch = || async {
        let transactions = state
            .ledger
            .get_recent_transaction_summaries(key.as_str(), limit)
            .await?;
        Ok::<_, ApiError>(HistoryData {
            wallet_key: key.as_str().to_string(),
            count: transactions.len(),
            transactions,
        })
    };

    let data = if limit == DEFAULT_HISTORY_LIMIT {
        let ttl = state.config.cache_ttls.transactions;
        state
            .cache
            .get_or_compute(&keys::transactions(key.as_str()), ttl, fetch)
            .await?
    } else {
        fetch().await?
    };

    Ok(Json(ApiResponse::ok(data)))
}

/// Cluster status (cached globally).
#[utoipa::path(
    get,
    path = "/api/solana/network",
    tag = "Solana",
    responses(
        (status = 200, description = "Network status"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn get_network_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<NetworkStatus>>, ApiError> {
    let ttl = state.config.cache_ttls.network_status;
    let status = state
        .cache
        .get_or_compute(keys::NETWORK_STATUS, ttl, || async {
            Ok::<_, ApiError>(state.ledger.get_network_status().await?)
        })
        .await?;

    Ok(Json(ApiResponse::ok(status)))
}

/// Check wallet key validity and on-chain existence.
#[utoipa::path(
    get,
    path = "/api/solana/validate/{wallet_key}",
    tag = "Solana",
    params(("wallet_key" = String, Path, description = "Base58 wallet public key")),
    responses((status = 200, description = "Validation result"))
)]
pub async fn validate_wallet(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
) -> Result<Json<ApiResponse<ValidateData>>, ApiError> {
    let Some(key) = WalletKey::parse(&wallet_key) else {
        // A malformed key is a negative result here, not a request error
        return Ok(Json(ApiResponse::ok(ValidateData {
            wallet_key,
            valid: false,
            exists: false,
            balance: 0.0,
        })));
    };

    let AccountProbe { exists, balance_sol } = state.ledger.probe_account(key.as_str()).await?;

    Ok(Json(ApiResponse::ok(ValidateData {
        wallet_key: key.as_str().to_string(),
        valid: true,
        exists,
        balance: balance_sol,
    })))
}

/// Verify a ledger transaction signature and fetch its details if present.
#[utoipa::path(
    get,
    path = "/api/solana/verify/{signature}",
    tag = "Solana",
    params(("signature" = String, Path, description = "Transaction signature")),
    responses((status = 200, description = "Verification result"))
)]
pub async fn verify_transaction(
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> Result<Json<ApiResponse<VerifyTransactionData>>, ApiError> {
    let verification = state.ledger.get_signature_status(&signature).await?;

    let details = if verification.exists {
        state.ledger.get_transaction_detail(&signature).await.ok()
    } else {
        None
    };

    Ok(Json(ApiResponse::ok(VerifyTransactionData {
        signature,
        verification,
        details,
    })))
}

/// Reconcile recent ledger transactions into the local store.
#[utoipa::path(
    post,
    path = "/api/solana/sync",
    tag = "Solana",
    params(LimitQuery),
    responses(
        (status = 200, description = "Sync complete"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn sync_transactions(
    Auth(wallet_key): Auth,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<SyncOutcome>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SYNC_LIMIT).min(MAX_LIMIT);

    let outcome = state.reconciliation.sync(&wallet_key, limit).await?;

    Ok(Json(ApiResponse::with_message(
        "Transactions synced successfully",
        outcome,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerError, LedgerGateway, LedgerResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts balance calls so cache behavior is observable.
    struct CountingLedger {
        balance_calls: AtomicUsize,
    }

    impl CountingLedger {
        fn new() -> Self {
            Self {
                balance_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerGateway for CountingLedger {
        async fn get_balance(&self, _wallet_key: &str) -> LedgerResult<Balance> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Balance::from_lamports(1_500_000_000))
        }

        async fn get_token_holdings(&self, _wallet_key: &str) -> LedgerResult<Vec<TokenHolding>> {
            Ok(vec![TokenHolding {
                mint: "mint-1".to_string(),
                amount: 12.5,
                decimals: 6,
            }])
        }

        async fn get_recent_transaction_summaries(
            &self,
            _wallet_key: &str,
            _limit: usize,
        ) -> LedgerResult<Vec<TransactionSummary>> {
            Ok(Vec::new())
        }

        async fn get_transaction_detail(
            &self,
            signature: &str,
        ) -> LedgerResult<TransactionDetail> {
            Err(LedgerError::NotFound(signature.to_string()))
        }

        async fn get_network_status(&self) -> LedgerResult<NetworkStatus> {
            Ok(NetworkStatus {
                version: "2.0.0".to_string(),
                current_slot: 1000,
                epoch: 5,
                slot_index: 10,
                slots_in_epoch: 432_000,
            })
        }

        async fn probe_account(&self, _wallet_key: &str) -> LedgerResult<AccountProbe> {
            Ok(AccountProbe {
                exists: true,
                balance_sol: 1.5,
            })
        }

        async fn get_signature_status(&self, _signature: &str) -> LedgerResult<SignatureProbe> {
            Ok(SignatureProbe {
                exists: true,
                confirmed: true,
                finalized: false,
                err: None,
            })
        }
    }

    fn state_with_counting_ledger() -> (AppState, Arc<CountingLedger>, tempfile::TempDir) {
        let ledger = Arc::new(CountingLedger::new());
        let (state, dir) = AppState::for_tests_with_ledger(ledger.clone());
        (state, ledger, dir)
    }

    fn wallet() -> String {
        bs58::encode([11u8; 32]).into_string()
    }

    #[tokio::test]
    async fn balance_is_cached_across_calls() {
        let (state, ledger, _dir) = state_with_counting_ledger();

        let first = get_balance(State(state.clone()), Path(wallet())).await.unwrap();
        assert_eq!(first.0.data.balance.sol, 1.5);

        let _second = get_balance(State(state), Path(wallet())).await.unwrap();
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn balance_rejects_malformed_wallet() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let err = get_balance(State(state), Path("bogus".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tokens_include_count() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let response = get_tokens(State(state), Path(wallet())).await.unwrap();
        assert_eq!(response.0.data.count, 1);
        assert_eq!(response.0.data.tokens[0].mint, "mint-1");
    }

    #[tokio::test]
    async fn validate_reports_malformed_keys_as_invalid() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let response = validate_wallet(State(state), Path("???".to_string()))
            .await
            .unwrap();
        assert!(!response.0.data.valid);
        assert!(!response.0.data.exists);
    }

    #[tokio::test]
    async fn validate_probes_existing_account() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let response = validate_wallet(State(state), Path(wallet())).await.unwrap();
        assert!(response.0.data.valid);
        assert!(response.0.data.exists);
        assert_eq!(response.0.data.balance, 1.5);
    }

    #[tokio::test]
    async fn network_status_comes_from_ledger() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let response = get_network_status(State(state)).await.unwrap();
        assert_eq!(response.0.data.version, "2.0.0");
        assert_eq!(response.0.data.epoch, 5);
    }

    #[tokio::test]
    async fn sync_returns_outcome_for_empty_ledger() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let wallet = wallet();
        let key = WalletKey::parse(&wallet).unwrap();
        state
            .db
            .create_or_rotate_nonce(&key, "n".to_string())
            .unwrap();

        let response = sync_transactions(
            Auth(wallet),
            State(state),
            Query(LimitQuery { limit: None }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.data, SyncOutcome::default());
    }

    #[tokio::test]
    async fn verify_transaction_attaches_details_only_when_found() {
        let (state, _ledger, _dir) = state_with_counting_ledger();
        let response = verify_transaction(State(state), Path("sig-1".to_string()))
            .await
            .unwrap();
        assert!(response.0.data.verification.exists);
        // Detail fetch returns NotFound in the stub, so details stay None
        assert!(response.0.data.details.is_none());
    }
}
