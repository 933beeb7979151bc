// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup and carried in
//! [`crate::state::AppState`]. Nothing reads environment variables after
//! boot.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory for the embedded database | `./data` |
//! | `SOLANA_NETWORK` | Network selection (`devnet`, `testnet`, `mainnet`) | `devnet` |
//! | `SOLANA_RPC_URL` | RPC endpoint override | Network default |
//! | `JWT_SECRET` | HMAC secret for session tokens | Required |
//! | `JWT_ACCESS_TTL_DAYS` | Access token lifetime | `7` |
//! | `JWT_REFRESH_TTL_DAYS` | Refresh token lifetime | `30` |
//! | `RATE_LIMIT_WINDOW_SECS` | Rate limit window | `900` |
//! | `RATE_LIMIT_MAX_REQUESTS` | General request ceiling per window | `100` |
//! | `RATE_LIMIT_AUTH_MAX_REQUESTS` | Auth endpoint ceiling per window | `50` |
//! | `CACHE_TTL_BALANCE_SECS` | Balance cache TTL | `30` |
//! | `CACHE_TTL_TRANSACTIONS_SECS` | Transaction history cache TTL | `60` |
//! | `CACHE_TTL_NETWORK_SECS` | Network status cache TTL | `120` |
//! | `CACHE_TTL_PROFILE_SECS` | Profile cache TTL | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Solana network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display and config matching
    pub name: &'static str,
    /// Public RPC endpoint URL
    pub rpc_url: &'static str,
}

/// Solana devnet configuration.
pub const SOLANA_DEVNET: NetworkConfig = NetworkConfig {
    name: "devnet",
    rpc_url: "https://api.devnet.solana.com",
};

/// Solana testnet configuration.
pub const SOLANA_TESTNET: NetworkConfig = NetworkConfig {
    name: "testnet",
    rpc_url: "https://api.testnet.solana.com",
};

/// Solana mainnet-beta configuration.
pub const SOLANA_MAINNET: NetworkConfig = NetworkConfig {
    name: "mainnet",
    rpc_url: "https://api.mainnet-beta.solana.com",
};

/// Cache TTLs per data class.
///
/// Balances and network status go stale quickly; profile-shaped data does
/// not. Each call site picks the TTL for its data class rather than sharing
/// a single constant.
#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub balance: Duration,
    pub transactions: Duration,
    pub network_status: Duration,
    pub profile: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            balance: Duration::from_secs(30),
            transactions: Duration::from_secs(60),
            network_status: Duration::from_secs(120),
            profile: Duration::from_secs(300),
        }
    }
}

/// Rate limiter settings (fixed window, per client IP).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Ceiling for general API routes per window
    pub max_requests: u32,
    /// Stricter ceiling for `/api/auth` routes per window
    pub auth_max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(900),
            max_requests: 100,
            auth_max_requests: 50,
        }
    }
}

/// Configuration error raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("unknown SOLANA_NETWORK `{0}` (expected devnet, testnet or mainnet)")]
    UnknownNetwork(String),

    #[error("invalid SOLANA_RPC_URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Database directory
    pub data_dir: PathBuf,
    /// Selected network
    pub network: NetworkConfig,
    /// RPC endpoint (network default unless overridden)
    pub rpc_url: String,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Rate limiter settings
    pub rate_limit: RateLimitConfig,
    /// Cache TTLs per data class
    pub cache_ttls: CacheTtls,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let network = match env::var("SOLANA_NETWORK")
            .unwrap_or_else(|_| "devnet".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "devnet" => SOLANA_DEVNET,
            "testnet" => SOLANA_TESTNET,
            // Accept the canonical cluster name as well
            "mainnet" | "mainnet-beta" => SOLANA_MAINNET,
            other => return Err(ConfigError::UnknownNetwork(other.to_string())),
        };

        let rpc_url = match env::var("SOLANA_RPC_URL") {
            Ok(raw) => {
                let parsed: url::Url = raw.parse()?;
                parsed.to_string()
            }
            Err(_) => network.rpc_url.to_string(),
        };

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: env::var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            network,
            rpc_url,
            jwt_secret,
            access_token_ttl: Duration::from_secs(env_u64("JWT_ACCESS_TTL_DAYS", 7) * 86_400),
            refresh_token_ttl: Duration::from_secs(env_u64("JWT_REFRESH_TTL_DAYS", 30) * 86_400),
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(env_u64("RATE_LIMIT_WINDOW_SECS", 900)),
                max_requests: env_u64("RATE_LIMIT_MAX_REQUESTS", 100) as u32,
                auth_max_requests: env_u64("RATE_LIMIT_AUTH_MAX_REQUESTS", 50) as u32,
            },
            cache_ttls: CacheTtls {
                balance: Duration::from_secs(env_u64("CACHE_TTL_BALANCE_SECS", 30)),
                transactions: Duration::from_secs(env_u64("CACHE_TTL_TRANSACTIONS_SECS", 60)),
                network_status: Duration::from_secs(env_u64("CACHE_TTL_NETWORK_SECS", 120)),
                profile: Duration::from_secs(env_u64("CACHE_TTL_PROFILE_SECS", 300)),
            },
        })
    }

    /// Construct a configuration for tests (no environment access).
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: PathBuf::from("."),
            network: SOLANA_DEVNET,
            rpc_url: SOLANA_DEVNET.rpc_url.to_string(),
            jwt_secret: "test-secret".to_string(),
            access_token_ttl: Duration::from_secs(7 * 86_400),
            refresh_token_ttl: Duration::from_secs(30 * 86_400),
            rate_limit: RateLimitConfig::default(),
            cache_ttls: CacheTtls::default(),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
