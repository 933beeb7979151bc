// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction store endpoints: paginated queries over reconciled history.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ApiResponse, PaginationMeta},
    state::AppState,
    storage::{StoredTransaction, TxCategory, TxFilter, TxStatus},
};

/// Default page size.
const DEFAULT_LIMIT: usize = 20;

/// Maximum page size.
const MAX_LIMIT: usize = 100;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for the transaction list.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// 1-based page number
    pub page: Option<usize>,
    /// Page size (max 100)
    pub limit: Option<usize>,
    /// Category filter (send, receive, swap, ...)
    pub category: Option<String>,
    /// Status filter (confirmed, finalized, failed)
    pub status: Option<String>,
}

/// Paginated transaction list.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListData {
    pub transactions: Vec<StoredTransaction>,
    pub pagination: PaginationMeta,
}

/// Single transaction payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionData {
    pub transaction: StoredTransaction,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the authenticated wallet's reconciled transactions, newest first.
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "Transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transactions"),
        (status = 400, description = "Unknown filter value")
    )
)]
pub async fn list_transactions(
    Auth(wallet_key): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<ApiResponse<TransactionListData>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let category = query
        .category
        .as_deref()
        .map(|raw| {
            TxCategory::from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown category `{raw}`")))
        })
        .transpose()?;
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            TxStatus::from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status `{raw}`")))
        })
        .transpose()?;

    let filter = TxFilter { category, status };
    let (transactions, total) = state.db.list_by_wallet(&wallet_key, &filter, page, limit)?;

    Ok(Json(ApiResponse::ok(TransactionListData {
        transactions,
        pagination: PaginationMeta::new(page, limit, total),
    })))
}

/// Look up one reconciled transaction by ledger signature.
#[utoipa::path(
    get,
    path = "/api/transactions/{signature}",
    tag = "Transactions",
    params(("signature" = String, Path, description = "Ledger signature")),
    responses(
        (status = 200, description = "Transaction"),
        (status = 404, description = "Not reconciled")
    )
)]
pub async fn get_transaction(
    Auth(_wallet_key): Auth,
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> Result<Json<ApiResponse<TransactionData>>, ApiError> {
    let transaction = state
        .db
        .get_transaction(&signature)?
        .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    Ok(Json(ApiResponse::ok(TransactionData { transaction })))
}
