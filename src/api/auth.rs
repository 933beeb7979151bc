// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints: challenge issuance, signature login, token
//! refresh and verification.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{verify_login, Auth, AuthError},
    models::{ApiResponse, UserView},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Issued challenge for the client to sign.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeData {
    /// Single-use nonce embedded in the message
    pub nonce: String,
    /// Exact message to sign
    pub message: String,
}

/// Login request carrying the detached signature.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Base58 wallet public key
    pub wallet_key: String,
    /// Base58 detached ed25519 signature over the challenge message
    pub signature: String,
    /// Signed message as seen by the client (advisory; verification uses the
    /// server-stored nonce)
    #[serde(default)]
    #[allow(dead_code)]
    pub message: Option<String>,
}

/// Successful login payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginData {
    /// Short-lived access token
    pub token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    pub user: UserView,
}

/// Refresh request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Rotated token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshData {
    pub token: String,
    pub refresh_token: String,
}

/// Token verification payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyData {
    pub wallet_key: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Issue a challenge nonce for a wallet.
///
/// Creates the identity lazily and rotates any previously issued nonce:
/// signatures over an older challenge stop verifying immediately.
#[utoipa::path(
    get,
    path = "/api/auth/nonce/{wallet_key}",
    tag = "Auth",
    params(("wallet_key" = String, Path, description = "Base58 wallet public key")),
    responses(
        (status = 200, description = "Challenge issued"),
        (status = 400, description = "Malformed wallet key")
    )
)]
pub async fn get_nonce(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
) -> Result<Json<ApiResponse<ChallengeData>>, AuthError> {
    let challenge = state.challenges.issue(&wallet_key)?;
    Ok(Json(ApiResponse::ok(ChallengeData {
        nonce: challenge.nonce,
        message: challenge.message,
    })))
}

/// Verify a challenge signature and mint session credentials.
///
/// The nonce is consumed atomically with credential issuance; replaying the
/// same signature afterwards fails with `challenge_not_found`.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Signature verification failed"),
        (status = 404, description = "No active challenge")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, AuthError> {
    let identity = verify_login(&state.db, &request.wallet_key, &request.signature)?;
    let pair = state.sessions.login(&identity.wallet_key)?;

    tracing::info!(wallet = %identity.wallet_key, "wallet authenticated");

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        LoginData {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserView::owner(identity),
        },
    )))
}

/// Exchange a refresh token for a fresh token pair.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated"),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshData>>, AuthError> {
    let pair = state.sessions.refresh(&request.refresh_token)?;
    Ok(Json(ApiResponse::ok(RefreshData {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    })))
}

/// Logout acknowledgement.
///
/// There is no server-side revocation list; logout is client-side token
/// discard.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged"))
)]
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::with_message("Logout successful", ()))
}

/// Validate the presented access token.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Token invalid or expired")
    )
)]
pub async fn verify(Auth(wallet_key): Auth) -> Json<ApiResponse<VerifyData>> {
    Json(ApiResponse::with_message(
        "Token is valid",
        VerifyData { wallet_key },
    ))
}
