// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StoreError;

/// Authentication error type.
///
/// Cryptographic and format errors are terminal for the request and carry a
/// stable machine-checkable code alongside the human message.
#[derive(Debug)]
pub enum AuthError {
    /// Wallet key is not a valid base58 ed25519 public key
    InvalidIdentity,
    /// No live nonce for this wallet (never issued, rotated, or consumed)
    ChallengeNotFound,
    /// Signature bytes do not verify against the challenge message
    SignatureMismatch,
    /// Signature or wallet key is not valid binary data of expected length
    DecodeError,
    /// Session token has expired
    ExpiredToken,
    /// Session token is malformed, mis-typed, or has a bad signature
    InvalidToken,
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Storage failure during an auth operation
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    message: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidIdentity => "invalid_identity",
            AuthError::ChallengeNotFound => "challenge_not_found",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::DecodeError => "decode_error",
            AuthError::ExpiredToken => "token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidIdentity | AuthError::DecodeError => StatusCode::BAD_REQUEST,
            AuthError::ChallengeNotFound => StatusCode::NOT_FOUND,
            AuthError::SignatureMismatch
            | AuthError::ExpiredToken
            | AuthError::InvalidToken
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidIdentity => write!(f, "Invalid Solana wallet address"),
            AuthError::ChallengeNotFound => {
                write!(f, "No active challenge. Please request a nonce first")
            }
            AuthError::SignatureMismatch => write!(f, "Invalid wallet signature"),
            AuthError::DecodeError => write!(f, "Failed to decode signature or wallet key"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "storage failure during auth");
        AuthError::Internal(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal detail stays in the log, not the response
        let message = match &self {
            AuthError::Internal(_) => "Authentication failed".to_string(),
            other => other.to_string(),
        };
        let body = Json(AuthErrorBody {
            success: false,
            message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn challenge_not_found_returns_404() {
        let response = AuthError::ChallengeNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "challenge_not_found");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn signature_mismatch_returns_401() {
        let response = AuthError::SignatureMismatch.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let response = AuthError::Internal("redb exploded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert!(!body["message"].as_str().unwrap().contains("redb"));
    }

    #[test]
    fn expired_and_invalid_tokens_are_distinct_codes() {
        assert_ne!(
            AuthError::ExpiredToken.error_code(),
            AuthError::InvalidToken.error_code()
        );
    }
}
