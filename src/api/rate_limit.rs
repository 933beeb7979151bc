// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window, per-client-IP rate limiting.
//!
//! Two ceilings apply: a general one for `/api` routes and a stricter one
//! for `/api/auth`. Health endpoints bypass both (they are mounted outside
//! the limited router).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// One fixed-window counter per client key.
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window rate limiter.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`; returns whether it is within the ceiling.
    pub fn check(&self, key: &str) -> bool {
        let Ok(mut buckets) = self.buckets.lock() else {
            return true;
        };
        let now = Instant::now();

        // Opportunistic cleanup of stale windows keeps the map bounded
        if buckets.len() > 10_000 {
            let window = self.window;
            buckets.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = buckets.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }
}

/// The two limiter scopes carried in [`AppState`].
pub struct RateLimiters {
    pub general: RateLimiter,
    pub auth: RateLimiter,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            general: RateLimiter::new(config.window, config.max_requests),
            auth: RateLimiter::new(config.window, config.auth_max_requests),
        }
    }
}

/// Best-effort client key: first `x-forwarded-for` hop, else socket address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn too_many_requests() -> Response {
    ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "Too many requests from this IP, please try again later",
    )
    .into_response()
}

/// Middleware applying the general ceiling.
pub async fn general(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    if !state.rate_limits.general.check(&key) {
        tracing::warn!(client = %key, "general rate limit exceeded");
        return too_many_requests();
    }
    next.run(request).await
}

/// Middleware applying the stricter auth ceiling.
pub async fn auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    if !state.rate_limits.auth.check(&key) {
        tracing::warn!(client = %key, "auth rate limit exceeded");
        return too_many_requests();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_is_enforced_per_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn window_resets_after_elapse() {
        let limiter = RateLimiter::new(Duration::from_millis(5), 1);
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(limiter.check("1.2.3.4"));
    }

    #[test]
    fn forwarded_header_wins_over_socket() {
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "9.9.9.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "9.9.9.9");
    }
}
