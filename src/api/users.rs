// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile and statistics endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    cache::keys,
    error::ApiError,
    models::{ApiResponse, UserView},
    state::AppState,
    storage::{ProfileUpdate, StoredTransaction, TxFilter, WalletAggregates, WalletKey},
};

// =============================================================================
// Response Types
// =============================================================================

/// Profile payload: owner view plus store-derived aggregates.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileData {
    pub user: UserView,
    pub stats: WalletAggregates,
}

/// Statistics payload for the authenticated wallet.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsData {
    pub total_transactions: u64,
    pub total_volume: f64,
    pub total_fees: f64,
    pub avg_amount: f64,
    /// Ten most recent reconciled transactions
    pub recent_activity: Vec<StoredTransaction>,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate profile fields before they reach storage.
fn validate_update(update: &ProfileUpdate) -> Result<(), ApiError> {
    if let Some(username) = &update.username {
        let ok_chars = username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if username.len() < 3 || username.len() > 20 || !ok_chars {
            return Err(ApiError::unprocessable(
                "Username must be 3-20 characters, alphanumeric with - and _",
            ));
        }
    }
    if let Some(email) = &update.email {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
            return Err(ApiError::unprocessable("Invalid email address"));
        }
    }
    if let Some(bio) = &update.bio {
        if bio.len() > 500 {
            return Err(ApiError::unprocessable("Bio must be at most 500 characters"));
        }
    }
    if let Some(avatar) = &update.avatar {
        if url::Url::parse(avatar).is_err() {
            return Err(ApiError::unprocessable("Avatar must be a valid URL"));
        }
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Current user's profile with aggregates (read-through cached).
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Profile"),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn get_profile(
    Auth(wallet_key): Auth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    let ttl = state.config.cache_ttls.profile;
    let data = state
        .cache
        .get_or_compute(&keys::profile(&wallet_key), ttl, || async {
            let identity = state
                .db
                .get_identity(&wallet_key)?
                .ok_or_else(|| ApiError::not_found("User not found"))?;
            let stats = state.db.wallet_aggregates(&wallet_key)?;
            Ok::<_, ApiError>(ProfileData {
                user: UserView::owner(identity),
                stats,
            })
        })
        .await?;

    Ok(Json(ApiResponse::ok(data)))
}

/// Update profile fields; untouched fields keep their values.
#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "Users",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_profile(
    Auth(wallet_key): Auth,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    validate_update(&update)?;

    let identity = state.db.update_profile(&wallet_key, update)?;

    // The cached profile projection is now stale
    state.cache.invalidate_wallet(&wallet_key);

    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        UserView::owner(identity),
    )))
}

/// Statistics for the authenticated wallet.
#[utoipa::path(
    get,
    path = "/api/users/stats",
    tag = "Users",
    responses((status = 200, description = "Statistics"))
)]
pub async fn get_stats(
    Auth(wallet_key): Auth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let aggregates = state.db.wallet_aggregates(&wallet_key)?;
    let (recent_activity, _) =
        state
            .db
            .list_by_wallet(&wallet_key, &TxFilter::default(), 1, 10)?;

    let avg_amount = if aggregates.transaction_count > 0 {
        aggregates.total_volume / aggregates.transaction_count as f64
    } else {
        0.0
    };

    Ok(Json(ApiResponse::ok(StatsData {
        total_transactions: aggregates.transaction_count,
        total_volume: aggregates.total_volume,
        total_fees: aggregates.total_fees,
        avg_amount,
        recent_activity,
    })))
}

/// Public view of a user by wallet key (email withheld).
#[utoipa::path(
    get,
    path = "/api/users/{wallet_key}",
    tag = "Users",
    params(("wallet_key" = String, Path, description = "Base58 wallet public key")),
    responses(
        (status = 200, description = "User"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(wallet_key): Path<String>,
) -> Result<Json<ApiResponse<UserView>>, ApiError> {
    let key = WalletKey::parse(&wallet_key)
        .ok_or_else(|| ApiError::bad_request("Invalid Solana wallet address"))?;

    let identity = state
        .db
        .get_identity(key.as_str())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(UserView::public(identity))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Preferences;

    fn seeded_state() -> (AppState, String, tempfile::TempDir) {
        let (state, dir) = AppState::for_tests();
        let wallet = bs58::encode([6u8; 32]).into_string();
        let key = WalletKey::parse(&wallet).unwrap();
        state
            .db
            .create_or_rotate_nonce(&key, "nonce".to_string())
            .unwrap();
        (state, wallet, dir)
    }

    #[tokio::test]
    async fn profile_round_trip_with_cache_invalidation() {
        let (state, wallet, _dir) = seeded_state();
        let auth = Auth(wallet.clone());

        let before = get_profile(auth, State(state.clone())).await.unwrap();
        assert!(before.0.data.user.username.is_none());

        // Update busts the cached projection
        let updated = update_profile(
            Auth(wallet.clone()),
            State(state.clone()),
            Json(ProfileUpdate {
                username: Some("alice".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.0.data.username.as_deref(), Some("alice"));

        let after = get_profile(Auth(wallet), State(state)).await.unwrap();
        assert_eq!(after.0.data.user.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn update_rejects_bad_username() {
        let (state, wallet, _dir) = seeded_state();

        let err = update_profile(
            Auth(wallet),
            State(state),
            Json(ProfileUpdate {
                username: Some("x".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "validation_error");
    }

    #[tokio::test]
    async fn update_rejects_bad_email_and_avatar() {
        let (state, wallet, _dir) = seeded_state();

        let err = update_profile(
            Auth(wallet.clone()),
            State(state.clone()),
            Json(ProfileUpdate {
                email: Some("not-an-email".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "validation_error");

        let err = update_profile(
            Auth(wallet),
            State(state),
            Json(ProfileUpdate {
                avatar: Some("not a url".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "validation_error");
    }

    #[tokio::test]
    async fn update_accepts_preferences() {
        let (state, wallet, _dir) = seeded_state();

        let updated = update_profile(
            Auth(wallet),
            State(state),
            Json(ProfileUpdate {
                preferences: Some(Preferences {
                    theme: crate::storage::Theme::Light,
                    notifications: false,
                }),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.0.data.preferences.theme, crate::storage::Theme::Light);
    }

    #[tokio::test]
    async fn public_view_withholds_email() {
        let (state, wallet, _dir) = seeded_state();

        update_profile(
            Auth(wallet.clone()),
            State(state.clone()),
            Json(ProfileUpdate {
                email: Some("alice@example.com".to_string()),
                ..ProfileUpdate::default()
            }),
        )
        .await
        .unwrap();

        let public = get_user(State(state), Path(wallet)).await.unwrap();
        assert!(public.0.data.email.is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_404_and_bad_key_is_400() {
        let (state, _wallet, _dir) = seeded_state();

        let missing = bs58::encode([250u8; 32]).into_string();
        let err = get_user(State(state.clone()), Path(missing)).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);

        let err = get_user(State(state), Path("garbage".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_handle_empty_store() {
        let (state, wallet, _dir) = seeded_state();
        let stats = get_stats(Auth(wallet), State(state)).await.unwrap();
        assert_eq!(stats.0.data.total_transactions, 0);
        assert_eq!(stats.0.data.avg_amount, 0.0);
        assert!(stats.0.data.recent_activity.is_empty());
    }
}
