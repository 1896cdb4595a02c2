// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CF_ACCESS_AUD` | Access application AUD tag expected in assertions | Required for assertion auth |
//! | `CF_ACCESS_TEAM_DOMAIN` | Only accept assertions from this team domain | Optional |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Key discovery timeout | `5` |
//! | `JWKS_CACHE_TTL_SECS` | Key set cache TTL (`0` disables caching) | `0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the expected assertion audience.
///
/// This is the "Application Audience (AUD) Tag" shown for the application in
/// the Cloudflare Zero Trust dashboard. Without it, assertion authentication
/// rejects every request.
pub const ACCESS_AUD_ENV: &str = "CF_ACCESS_AUD";

/// Environment variable name for the team domain, e.g. `myteam.cloudflareaccess.com`.
pub const TEAM_DOMAIN_ENV: &str = "CF_ACCESS_TEAM_DOMAIN";

pub const FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Settings for assertion authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Expected audience; empty means not configured
    pub audience: String,
    /// Team domain the issuer must belong to
    pub team_domain: Option<String>,
    /// Key discovery timeout
    pub fetch_timeout: Duration,
    /// Key set cache TTL, zero disables caching
    pub cache_ttl: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            audience: String::new(),
            team_domain: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_ttl: Duration::ZERO,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub access: AccessConfig,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match non_empty(PORT_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(variable = PORT_ENV, value = %raw, default = DEFAULT_PORT, "Invalid port, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let access = AccessConfig {
            audience: non_empty(ACCESS_AUD_ENV).unwrap_or_default(),
            team_domain: non_empty(TEAM_DOMAIN_ENV),
            fetch_timeout: seconds(non_empty(FETCH_TIMEOUT_ENV), FETCH_TIMEOUT_ENV, DEFAULT_FETCH_TIMEOUT, false),
            cache_ttl: seconds(non_empty(CACHE_TTL_ENV), CACHE_TTL_ENV, Duration::ZERO, true),
        };

        Self {
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            access,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Whole seconds from `raw`. Zero is only valid where it means "off".
fn seconds(raw: Option<String>, variable: &str, default: Duration, allow_zero: bool) -> Duration {
    match raw {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 || allow_zero => Duration::from_secs(secs),
            _ => {
                tracing::warn!(variable, value = %raw, default = ?default, "Invalid duration, using default");
                default
            }
        },
        None => default,
    }
}
