// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Challenge-response wallet authentication and JWT sessions.
//!
//! ## Auth Flow
//!
//! 1. Client requests a challenge for its wallet key
//!    (`GET /api/auth/nonce/{wallet_key}`)
//! 2. Server rotates a single-use CSPRNG nonce on the identity and returns
//!    the challenge message embedding it
//! 3. Client signs the message with its ed25519 keypair (wallet side)
//! 4. Client submits the detached signature (`POST /api/auth/login`); the
//!    server rebuilds the message from the *stored* nonce, verifies the
//!    signature, and consumes the nonce in the same storage transaction
//! 5. Server mints an access/refresh token pair bound to the wallet key
//!
//! ## Security
//!
//! - A nonce never verifies twice: consumption is a compare-and-swap in the
//!   storage layer, which serializes concurrent replays
//! - Issuing a new challenge invalidates any signature over the prior one
//! - Access and refresh tokens are type-tagged and not interchangeable

pub mod challenge;
pub mod error;
pub mod extractor;
pub mod session;
pub mod signature;

pub use challenge::{Challenge, ChallengeManager};
pub use error::AuthError;
pub use extractor::Auth;
pub use session::{SessionIssuer, TokenPair};
pub use signature::verify_login;
