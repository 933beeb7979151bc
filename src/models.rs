// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared API models: the uniform response envelope and cross-endpoint
//! projections. Endpoint-specific request/response types live next to their
//! handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{Identity, Preferences};

/// Uniform success envelope: `{ success, message, data }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "Success".to_string(),
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Identity projection for API responses.
///
/// The live nonce is never serialized. Email is present only in the
/// owner-facing variant. `Deserialize` exists so the profile cache can
/// round-trip the view.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub wallet_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub preferences: Preferences,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub transaction_count: u64,
    pub total_volume: f64,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    /// Owner-facing view (includes email).
    pub fn owner(identity: Identity) -> Self {
        Self::build(identity, true)
    }

    /// Public view (email withheld).
    pub fn public(identity: Identity) -> Self {
        Self::build(identity, false)
    }

    fn build(identity: Identity, include_email: bool) -> Self {
        Self {
            wallet_key: identity.wallet_key,
            username: identity.profile.username,
            email: identity.profile.email.filter(|_| include_email),
            bio: identity.profile.bio,
            avatar: identity.profile.avatar,
            preferences: identity.profile.preferences,
            last_login_at: identity.last_login_at,
            transaction_count: identity.transaction_count,
            total_volume: identity.total_volume,
            created_at: identity.created_at,
        }
    }
}

/// Pagination metadata for list endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            current_page: page,
            total_pages,
            total_items: total,
            items_per_page: limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Profile, WalletKey};

    fn identity() -> Identity {
        let key = WalletKey::parse(&bs58::encode([2u8; 32]).into_string()).unwrap();
        let mut identity = Identity::new(&key, "secret-nonce".to_string());
        identity.profile = Profile {
            username: Some("alice".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Profile::default()
        };
        identity
    }

    #[test]
    fn owner_view_includes_email_public_does_not() {
        let owner = UserView::owner(identity());
        assert_eq!(owner.email.as_deref(), Some("alice@example.com"));

        let public = UserView::public(identity());
        assert!(public.email.is_none());
        assert_eq!(public.username.as_deref(), Some("alice"));
    }

    #[test]
    fn views_never_serialize_the_nonce() {
        let serialized = serde_json::to_string(&UserView::owner(identity())).unwrap();
        assert!(!serialized.contains("secret-nonce"));
        assert!(!serialized.contains("nonce"));
    }

    #[test]
    fn pagination_math() {
        let meta = PaginationMeta::new(2, 20, 45);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);

        let last = PaginationMeta::new(3, 20, 45);
        assert!(!last.has_next_page);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }
}
