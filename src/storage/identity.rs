// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity records: one per wallet, created lazily on first challenge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Base58 alphabet length bounds for a 32-byte Solana public key.
const WALLET_KEY_MIN_LEN: usize = 32;
const WALLET_KEY_MAX_LEN: usize = 44;

/// A validated, canonical wallet public key.
///
/// Base58 is case-sensitive, so canonicalization is decode-then-re-encode of
/// the 32-byte ed25519 public key rather than case folding. Two spellings of
/// the same key (e.g. with surrounding whitespace) map to one canonical
/// string, which is the identity primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletKey {
    canonical: String,
    bytes: [u8; 32],
}

impl WalletKey {
    /// Parse and canonicalize a wallet key.
    ///
    /// Returns `None` for anything that is not a base58-encoded 32-byte
    /// public key.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() < WALLET_KEY_MIN_LEN || trimmed.len() > WALLET_KEY_MAX_LEN {
            return None;
        }
        // Cheap charset pre-check before decoding
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
        {
            return None;
        }
        let decoded = bs58::decode(trimmed).into_vec().ok()?;
        let bytes: [u8; 32] = decoded.try_into().ok()?;
        Some(Self {
            canonical: bs58::encode(bytes).into_string(),
            bytes,
        })
    }

    /// Canonical base58 string (identity primary key).
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Raw ed25519 public key bytes.
    pub fn public_key_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for WalletKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Default for Theme {
    fn default() -> Self {
        Self::Dark
    }
}

/// Per-identity preference map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_notifications() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            notifications: true,
        }
    }
}

/// Optional display fields attached to an identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Durable identity record, keyed by canonical wallet key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Canonical base58 wallet public key
    pub wallet_key: String,
    /// Live challenge nonce; `None` once consumed by a successful login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Display fields
    #[serde(default)]
    pub profile: Profile,
    /// Last successful authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Reconciled transaction count (derived from the transaction store)
    #[serde(default)]
    pub transaction_count: u64,
    /// Total reconciled volume in SOL
    #[serde(default)]
    pub total_volume: f64,
    /// Total fees paid in SOL
    #[serde(default)]
    pub total_fees: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create a fresh identity with a live nonce.
    pub fn new(wallet_key: &WalletKey, nonce: String) -> Self {
        let now = Utc::now();
        Self {
            wallet_key: wallet_key.as_str().to_string(),
            nonce: Some(nonce),
            profile: Profile::default(),
            last_login_at: None,
            transaction_count: 0,
            total_volume: 0.0,
            total_fees: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Preferences>,
}

impl ProfileUpdate {
    /// Apply the update to an existing profile.
    pub fn apply(self, profile: &mut Profile) {
        if let Some(username) = self.username {
            profile.username = Some(username);
        }
        if let Some(email) = self.email {
            profile.email = Some(email);
        }
        if let Some(bio) = self.bio {
            profile.bio = Some(bio);
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = Some(avatar);
        }
        if let Some(preferences) = self.preferences {
            profile.preferences = preferences;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_key() -> String {
        bs58::encode([7u8; 32]).into_string()
    }

    #[test]
    fn parse_accepts_valid_key() {
        let encoded = valid_key();
        let key = WalletKey::parse(&encoded).unwrap();
        assert_eq!(key.as_str(), encoded);
        assert_eq!(key.public_key_bytes(), &[7u8; 32]);
    }

    #[test]
    fn parse_trims_whitespace() {
        let encoded = valid_key();
        let key = WalletKey::parse(&format!("  {encoded}\n")).unwrap();
        assert_eq!(key.as_str(), encoded);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(WalletKey::parse("").is_none());
        assert!(WalletKey::parse("too-short").is_none());
        // '0', 'O', 'I', 'l' are not in the base58 alphabet
        assert!(WalletKey::parse("0000000000000000000000000000000000000000").is_none());
        // Valid charset but wrong payload length
        assert!(WalletKey::parse("1111111111111111111111111111111111111111111111111111").is_none());
    }

    #[test]
    fn parse_rejects_case_mangled_key() {
        // Lowercasing a base58 key yields a different (usually invalid) payload
        let encoded = valid_key();
        let mangled = encoded.to_lowercase();
        if let Some(key) = WalletKey::parse(&mangled) {
            assert_ne!(key.as_str(), encoded);
        }
    }

    #[test]
    fn profile_update_applies_only_set_fields() {
        let mut profile = Profile {
            username: Some("alice".to_string()),
            bio: Some("hello".to_string()),
            ..Profile::default()
        };

        ProfileUpdate {
            username: Some("bob".to_string()),
            ..ProfileUpdate::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.username.as_deref(), Some("bob"));
        assert_eq!(profile.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn new_identity_has_live_nonce_and_zero_counters() {
        let key = WalletKey::parse(&valid_key()).unwrap();
        let identity = Identity::new(&key, "abc123".to_string());
        assert_eq!(identity.nonce.as_deref(), Some("abc123"));
        assert_eq!(identity.transaction_count, 0);
        assert!(identity.last_login_at.is_none());
    }
}
