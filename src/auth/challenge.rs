// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge issuance: single-use nonces bound to an identity.

use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};

use super::AuthError;
use crate::storage::{WalletDatabase, WalletKey};

/// Nonce length in random bytes (hex-encoded to twice this many chars).
const NONCE_BYTES: usize = 16;

/// An issued challenge.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// The nonce embedded in the message
    pub nonce: String,
    /// Human-readable message the client signs verbatim
    pub message: String,
}

/// Build the exact challenge message for a nonce.
///
/// Verification reconstructs this string from the stored nonce, so the
/// format is part of the protocol: changing it invalidates in-flight
/// challenges.
pub fn challenge_message(nonce: &str) -> String {
    format!("Sign this message to authenticate with nonce: {nonce}")
}

/// Generate a fresh high-entropy nonce from the OS CSPRNG.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates and rotates single-use nonces bound to an identity.
pub struct ChallengeManager {
    db: Arc<WalletDatabase>,
}

impl ChallengeManager {
    pub fn new(db: Arc<WalletDatabase>) -> Self {
        Self { db }
    }

    /// Issue a challenge for a wallet, creating its identity lazily.
    ///
    /// Overwrites any previously issued, unconsumed nonce: at most one live
    /// challenge per identity. Under concurrent issuance the last write wins
    /// in storage, but the returned nonce is authoritative for this caller's
    /// own signing.
    pub fn issue(&self, raw_wallet_key: &str) -> Result<Challenge, AuthError> {
        let wallet_key = WalletKey::parse(raw_wallet_key).ok_or(AuthError::InvalidIdentity)?;

        let nonce = generate_nonce();
        self.db.create_or_rotate_nonce(&wallet_key, nonce.clone())?;

        tracing::debug!(wallet = %wallet_key, "issued challenge");

        Ok(Challenge {
            message: challenge_message(&nonce),
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (ChallengeManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(WalletDatabase::open(&dir.path().join("test.redb")).unwrap());
        (ChallengeManager::new(db), dir)
    }

    fn wallet() -> String {
        bs58::encode([5u8; 32]).into_string()
    }

    #[test]
    fn nonce_is_hex_and_long_enough() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn consecutive_challenges_yield_different_nonces() {
        let (manager, _dir) = manager();
        let wallet = wallet();

        let first = manager.issue(&wallet).unwrap();
        let second = manager.issue(&wallet).unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert!(second.message.contains(&second.nonce));
    }

    #[test]
    fn issue_rejects_malformed_wallet() {
        let (manager, _dir) = manager();
        let err = manager.issue("not-a-wallet").unwrap_err();
        assert!(matches!(err, AuthError::InvalidIdentity));
    }

    #[test]
    fn message_embeds_nonce_verbatim() {
        assert_eq!(
            challenge_message("abc"),
            "Sign this message to authenticate with nonce: abc"
        );
    }
}
