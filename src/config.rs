// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and
//! validated before the server binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret (at least 32 characters) | Required |
//! | `JWT_TTL_SECS` | Access token lifetime | `86400` |
//! | `JWT_ISSUER` | `iss` claim | `tenant-identity` |
//! | `JWT_AUDIENCE` | `aud` claim | `tenant-identity-api` |
//! | `PASSWORD_HASH_COST` | Argon2 iterations | `3` |
//! | `PASSWORD_HASH_MEMORY_KIB` | Argon2 memory (KiB) | `19456` |
//! | `PLATFORM_DOMAIN` | Suffix under which one label names a tenant | `localhost` |
//! | `TENANT_CACHE_TTL_SECS` | Tenant cache TTL | `3600` |
//! | `FEATURE_CACHE_TTL_SECS` | Feature flag cache TTL | `3600` |
//! | `CACHE_CAPACITY` | In-process cache size (keys) | `10000` |
//! | `TENANT_SKIP_PATHS` | Comma list of prefixes that skip tenant resolution | `/health,/docs,/api-doc,/static,/favicon.ico` |
//! | `TENANT_REQUIRED_PATHS` | Comma list of prefixes that require a tenant | `/api` |
//! | `DEFAULT_TENANT_DOMAIN` | Fallback tenant domain for localhost requests | Unset |
//! | `SEED_TENANT_DOMAIN` | Provision a demo tenant on startup (in-memory store) | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use crate::auth::password::{DEFAULT_HASH_COST, DEFAULT_HASH_MEMORY_KIB};
use crate::auth::token::{TokenConfig, DEFAULT_TOKEN_TTL, MIN_SECRET_LEN};
use crate::tenant::ResolutionConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECS";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const PASSWORD_HASH_COST_ENV: &str = "PASSWORD_HASH_COST";
pub const PASSWORD_HASH_MEMORY_ENV: &str = "PASSWORD_HASH_MEMORY_KIB";
pub const PLATFORM_DOMAIN_ENV: &str = "PLATFORM_DOMAIN";
pub const TENANT_CACHE_TTL_ENV: &str = "TENANT_CACHE_TTL_SECS";
pub const FEATURE_CACHE_TTL_ENV: &str = "FEATURE_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const TENANT_SKIP_PATHS_ENV: &str = "TENANT_SKIP_PATHS";
pub const TENANT_REQUIRED_PATHS_ENV: &str = "TENANT_REQUIRED_PATHS";
pub const DEFAULT_TENANT_DOMAIN_ENV: &str = "DEFAULT_TENANT_DOMAIN";
pub const SEED_TENANT_DOMAIN_ENV: &str = "SEED_TENANT_DOMAIN";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_ISSUER: &str = "tenant-identity";
pub const DEFAULT_AUDIENCE: &str = "tenant-identity-api";
pub const DEFAULT_PLATFORM_DOMAIN: &str = "localhost";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("failed to initialise token codec: {0}")]
    Token(#[from] crate::auth::TokenError),
    #[error("failed to initialise password hasher: {0}")]
    Password(#[from] crate::auth::password::PasswordError),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub token: TokenConfig,
    pub password_hash_cost: u32,
    pub password_hash_memory_kib: u32,
    pub platform_domain: String,
    pub tenant_cache_ttl: Duration,
    pub feature_cache_ttl: Duration,
    pub cache_capacity: usize,
    pub skip_paths: Vec<String>,
    pub required_paths: Vec<String>,
    pub default_tenant_domain: Option<String>,
    pub seed_tenant_domain: Option<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Defaults everywhere, with the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let resolution = ResolutionConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            token: TokenConfig {
                secret: secret.into(),
                ttl: DEFAULT_TOKEN_TTL,
                issuer: DEFAULT_ISSUER.to_string(),
                audience: DEFAULT_AUDIENCE.to_string(),
            },
            password_hash_cost: DEFAULT_HASH_COST,
            password_hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            platform_domain: DEFAULT_PLATFORM_DOMAIN.to_string(),
            tenant_cache_ttl: DEFAULT_CACHE_TTL,
            feature_cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            skip_paths: resolution.skip_paths,
            required_paths: resolution.required_paths,
            default_tenant_domain: None,
            seed_tenant_domain: None,
            log_format: LogFormat::default(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_SECRET_LEN} characters"),
            });
        }

        let mut config = Self::with_secret(secret);

        if let Some(host) = get(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = parse(&get, PORT_ENV)? {
            config.port = port;
        }
        if let Some(ttl) = parse::<u64>(&get, JWT_TTL_ENV)? {
            config.token.ttl = positive_secs(JWT_TTL_ENV, ttl)?;
        }
        if let Some(issuer) = get(JWT_ISSUER_ENV) {
            config.token.issuer = issuer;
        }
        if let Some(audience) = get(JWT_AUDIENCE_ENV) {
            config.token.audience = audience;
        }
        if let Some(cost) = parse(&get, PASSWORD_HASH_COST_ENV)? {
            config.password_hash_cost = cost;
        }
        if let Some(memory) = parse(&get, PASSWORD_HASH_MEMORY_ENV)? {
            config.password_hash_memory_kib = memory;
        }
        if let Some(domain) = get(PLATFORM_DOMAIN_ENV) {
            config.platform_domain = domain.to_ascii_lowercase();
        }
        if let Some(ttl) = parse::<u64>(&get, TENANT_CACHE_TTL_ENV)? {
            config.tenant_cache_ttl = positive_secs(TENANT_CACHE_TTL_ENV, ttl)?;
        }
        if let Some(ttl) = parse::<u64>(&get, FEATURE_CACHE_TTL_ENV)? {
            config.feature_cache_ttl = positive_secs(FEATURE_CACHE_TTL_ENV, ttl)?;
        }
        if let Some(capacity) = parse(&get, CACHE_CAPACITY_ENV)? {
            config.cache_capacity = capacity;
        }
        if let Some(paths) = get(TENANT_SKIP_PATHS_ENV) {
            config.skip_paths = path_list(&paths);
        }
        if let Some(paths) = get(TENANT_REQUIRED_PATHS_ENV) {
            config.required_paths = path_list(&paths);
        }
        config.default_tenant_domain = get(DEFAULT_TENANT_DOMAIN_ENV).map(|d| d.to_ascii_lowercase());
        config.seed_tenant_domain = get(SEED_TENANT_DOMAIN_ENV).map(|d| d.to_ascii_lowercase());
        if let Some(format) = get(LOG_FORMAT_ENV) {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{format}`"),
            })?;
        }

        Ok(config)
    }

    pub fn resolution(&self) -> ResolutionConfig {
        ResolutionConfig {
            skip_paths: self.skip_paths.clone(),
            required_paths: self.required_paths.clone(),
            cache_ttl: self.tenant_cache_ttl,
            fallback_domain: self.default_tenant_domain.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    get(var)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn positive_secs(var: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
