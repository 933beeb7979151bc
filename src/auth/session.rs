// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session credentials: signed, tamper-evident JWTs binding a wallet key
//! and an expiry.
//!
//! Access tokens are short-lived (days — acceptable here because mid-life
//! revocation is not required), refresh tokens long-lived (weeks). There is
//! no server-side revocation list; logout is client-side token discard.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Discriminates access from refresh tokens so one cannot stand in for the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for both token kinds.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Canonical wallet key
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Token kind
    pub typ: TokenKind,
}

/// An access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and verifies session tokens.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl SessionIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Mint a fresh token pair for an authenticated wallet.
    ///
    /// Only callable after signature verification has succeeded.
    pub fn login(&self, wallet_key: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.mint(wallet_key, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.mint(wallet_key, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    /// Verify an access token and return the wallet key it is bound to.
    ///
    /// Fails with [`AuthError::ExpiredToken`] or [`AuthError::InvalidToken`]
    /// distinctly so callers can choose between re-authentication and silent
    /// refresh.
    pub fn verify_session(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.decode_kind(token, TokenKind::Access)?;
        Ok(claims.sub)
    }

    /// Exchange a valid refresh token for a fresh token pair.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.decode_kind(refresh_token, TokenKind::Refresh)?;
        self.login(&claims.sub)
    }

    fn mint(
        &self,
        wallet_key: &str,
        typ: TokenKind,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: wallet_key.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            typ,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<SessionClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            },
        )?;
        if data.claims.typ != expected {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}
