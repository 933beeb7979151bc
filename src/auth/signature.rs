// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Detached ed25519 signature verification against the stored challenge.
//!
//! The message bytes are reconstructed from the nonce currently stored for
//! the wallet — never from client input — so a client asserting a stale or
//! forged nonce fails before any cryptography runs.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use super::challenge::challenge_message;
use super::AuthError;
use crate::storage::{Identity, WalletDatabase, WalletKey};

/// Verify a login signature and consume the nonce.
///
/// On success the consumed nonce is invalidated and the login timestamp set
/// in one storage transaction, so the same signature cannot verify twice
/// even under concurrent replay: exactly one caller observes the live nonce.
///
/// Errors:
/// - [`AuthError::InvalidIdentity`] — malformed wallet key
/// - [`AuthError::ChallengeNotFound`] — no identity, or nonce already consumed
/// - [`AuthError::DecodeError`] — signature is not 64 bytes of valid base58
/// - [`AuthError::SignatureMismatch`] — cryptographic check failed
pub fn verify_login(
    db: &WalletDatabase,
    raw_wallet_key: &str,
    signature_b58: &str,
) -> Result<Identity, AuthError> {
    let wallet_key = WalletKey::parse(raw_wallet_key).ok_or(AuthError::InvalidIdentity)?;

    let identity = db
        .get_identity(wallet_key.as_str())?
        .ok_or(AuthError::ChallengeNotFound)?;
    let nonce = identity.nonce.ok_or(AuthError::ChallengeNotFound)?;

    let message = challenge_message(&nonce);

    let signature_bytes = bs58::decode(signature_b58)
        .into_vec()
        .map_err(|_| AuthError::DecodeError)?;
    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| AuthError::DecodeError)?;
    let signature = Signature::from_bytes(&signature_bytes);

    let verifying_key = VerifyingKey::from_bytes(wallet_key.public_key_bytes())
        .map_err(|_| AuthError::DecodeError)?;

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| AuthError::SignatureMismatch)?;

    // Consume exactly the nonce we verified against. If a concurrent login
    // or re-issuance got there first, the challenge is gone.
    db.consume_nonce(wallet_key.as_str(), &nonce)?
        .ok_or(AuthError::ChallengeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::challenge::ChallengeManager;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use std::sync::Arc;

    struct Harness {
        db: Arc<WalletDatabase>,
        manager: ChallengeManager,
        signing_key: SigningKey,
        wallet: String,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(WalletDatabase::open(&dir.path().join("test.redb")).unwrap());
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        Harness {
            manager: ChallengeManager::new(db.clone()),
            db,
            signing_key,
            wallet,
            _dir: dir,
        }
    }

    fn sign(harness: &Harness, message: &str) -> String {
        let signature = harness.signing_key.sign(message.as_bytes());
        bs58::encode(signature.to_bytes()).into_string()
    }

    #[test]
    fn valid_signature_verifies_exactly_once() {
        let h = harness();
        let challenge = h.manager.issue(&h.wallet).unwrap();
        let signature = sign(&h, &challenge.message);

        let identity = verify_login(&h.db, &h.wallet, &signature).unwrap();
        assert!(identity.nonce.is_none());
        assert!(identity.last_login_at.is_some());

        // Replaying the same signature fails: the nonce is consumed
        let err = verify_login(&h.db, &h.wallet, &signature).unwrap_err();
        assert!(matches!(err, AuthError::ChallengeNotFound));
    }

    #[test]
    fn signature_over_stale_nonce_fails_after_reissue() {
        let h = harness();
        let first = h.manager.issue(&h.wallet).unwrap();
        let stale_signature = sign(&h, &first.message);

        // Issuing a new challenge invalidates the prior one
        let _second = h.manager.issue(&h.wallet).unwrap();

        let err = verify_login(&h.db, &h.wallet, &stale_signature).unwrap_err();
        assert!(matches!(err, AuthError::SignatureMismatch));
    }

    #[test]
    fn wrong_key_signature_is_mismatch() {
        let h = harness();
        let challenge = h.manager.issue(&h.wallet).unwrap();

        let other_key = SigningKey::generate(&mut OsRng);
        let forged = other_key.sign(challenge.message.as_bytes());
        let forged_b58 = bs58::encode(forged.to_bytes()).into_string();

        let err = verify_login(&h.db, &h.wallet, &forged_b58).unwrap_err();
        assert!(matches!(err, AuthError::SignatureMismatch));
    }

    #[test]
    fn undecodable_signature_is_decode_error() {
        let h = harness();
        h.manager.issue(&h.wallet).unwrap();

        // Not base58
        let err = verify_login(&h.db, &h.wallet, "!!!not-base58!!!").unwrap_err();
        assert!(matches!(err, AuthError::DecodeError));

        // Base58 but wrong length
        let short = bs58::encode([1u8; 10]).into_string();
        let err = verify_login(&h.db, &h.wallet, &short).unwrap_err();
        assert!(matches!(err, AuthError::DecodeError));
    }

    #[test]
    fn unknown_wallet_has_no_challenge() {
        let h = harness();
        let stranger = bs58::encode([42u8; 32]).into_string();
        let signature = bs58::encode([0u8; 64]).into_string();

        let err = verify_login(&h.db, &stranger, &signature).unwrap_err();
        assert!(matches!(err, AuthError::ChallengeNotFound));
    }

    #[test]
    fn malformed_wallet_is_invalid_identity() {
        let h = harness();
        let err = verify_login(&h.db, "garbage", "garbage").unwrap_err();
        assert!(matches!(err, AuthError::InvalidIdentity));
    }
}
