// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod auth;
pub mod health;
pub mod rate_limit;
pub mod solana;
pub mod transactions;
pub mod users;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/nonce/{wallet_key}", get(auth::get_nonce))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/verify", get(auth::verify))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::auth,
        ));

    let user_routes = Router::new()
        .route(
            "/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/stats", get(users::get_stats))
        .route("/{wallet_key}", get(users::get_user));

    let solana_routes = Router::new()
        .route("/balance/{wallet_key}", get(solana::get_balance))
        .route("/tokens/{wallet_key}", get(solana::get_tokens))
        .route("/transactions/{wallet_key}", get(solana::get_history))
        .route("/network", get(solana::get_network_status))
        .route("/validate/{wallet_key}", get(solana::validate_wallet))
        .route("/verify/{signature}", get(solana::verify_transaction))
        .route("/sync", post(solana::sync_transactions));

    let transaction_routes = Router::new()
        .route("/", get(transactions::list_transactions))
        .route("/{signature}", get(transactions::get_transaction));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/solana", solana_routes)
        .nest("/transactions", transaction_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::general,
        ));

    // Health endpoints sit outside the rate-limited tree
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::get_nonce,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::verify,
        users::get_profile,
        users::update_profile,
        users::get_stats,
        users::get_user,
        solana::get_balance,
        solana::get_tokens,
        solana::get_history,
        solana::get_network_status,
        solana::validate_wallet,
        solana::verify_transaction,
        solana::sync_transactions,
        transactions::list_transactions,
        transactions::get_transaction
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            auth::ChallengeData,
            auth::LoginRequest,
            auth::LoginData,
            auth::RefreshRequest,
            auth::RefreshData,
            auth::VerifyData,
            users::ProfileData,
            users::StatsData,
            solana::BalanceData,
            solana::TokensData,
            solana::HistoryData,
            solana::ValidateData,
            solana::VerifyTransactionData,
            transactions::TransactionListData,
            transactions::TransactionData,
            crate::models::UserView,
            crate::models::PaginationMeta,
            crate::storage::ProfileUpdate,
            crate::storage::Preferences,
            crate::storage::Theme,
            crate::storage::Profile,
            crate::storage::StoredTransaction,
            crate::storage::TxCategory,
            crate::storage::TxStatus,
            crate::storage::WalletAggregates,
            crate::ledger::Balance,
            crate::ledger::TokenHolding,
            crate::ledger::TransactionSummary,
            crate::ledger::TransactionDetail,
            crate::ledger::NetworkStatus,
            crate::ledger::AccountProbe,
            crate::ledger::SignatureProbe,
            crate::sync::SyncOutcome
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Challenge-response wallet authentication"),
        (name = "Users", description = "Profiles and statistics"),
        (name = "Solana", description = "Ledger reads and reconciliation"),
        (name = "Transactions", description = "Reconciled transaction history")
    )
)]
struct ApiDoc;
