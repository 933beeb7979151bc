// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type and uniform error envelope.
//!
//! Every user-visible failure carries a stable, machine-checkable
//! `error_code` plus a human message. Upstream/internal detail is only
//! attached when the `dev` feature is enabled.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::storage::StoreError;
use crate::sync::SyncError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Upstream detail, exposed only in dev builds
    pub detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Attach upstream detail (surfaced only when the `dev` feature is on).
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(what),
            other => {
                tracing::error!(error = %other, "storage failure");
                Self::internal("Storage operation failed").with_detail(other.to_string())
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            // Upstream transient failure is recoverable by caller retry and
            // must carry context rather than surfacing as a bare 500.
            LedgerError::Unavailable(detail) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "ledger_unavailable",
                "Solana network is temporarily unavailable, please retry",
            )
            .with_detail(detail),
            LedgerError::InvalidResponse(detail) => {
                Self::internal("Unexpected response from the Solana network").with_detail(detail)
            }
            LedgerError::NotFound(what) => Self::not_found(what),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Ledger(e) => e.into(),
            SyncError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[cfg(feature = "dev")]
        let error = self.detail;
        #[cfg(not(feature = "dev"))]
        let error = None;

        let body = Json(ErrorBody {
            success: false,
            message: self.message,
            error_code: self.code.to_string(),
            error,
        });
        (self.status, body).into_response()
    }
}
