// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Lists are
//! comma separated; empty entries are ignored.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SEKI_URL` | Seki base URL | Required |
//! | `SEKI_TIMEOUT_SECS` | Seki HTTP timeout | `10` |
//! | `AUTH_ISSUERS` | Trusted signed-token issuers | `Seki` |
//! | `AUTH_SEKI_SECRET` | Shared secret for the `Seki` issuer | Optional |
//! | `AUTH_JWKS_URLS` | `issuer=url` pairs for other issuers | Optional |
//! | `AUTH_AUDIENCES` | Valid audiences (empty: not checked) | Optional |
//! | `AUTH_TOKEN_STRATEGY` | `seki`, `jwt` or `auto` | `auto` |
//! | `AUTH_SECURED_PATHS` | Replaces the secured defaults | `/api/**` |
//! | `AUTH_ADDITIONAL_SECURED_PATHS` | Appended to secured patterns | Optional |
//! | `AUTH_PERMITTED_PATHS` | Replaces the public defaults | actuator, docs, `/error` |
//! | `AUTH_ADDITIONAL_PERMITTED_PATHS` | Appended to public patterns | Optional |
//! | `AUTH_MATCHED_PATHS` | Replaces the governed defaults | `/**` |
//! | `AUTH_ADDITIONAL_MATCHED_PATHS` | Appended to governed patterns | Optional |
//! | `AUTH_SESSION_CREATION_POLICY` | `stateless`, `never`, `if_required`, `always` | `stateless` |
//! | `AUTH_CSRF_ENABLED` | Refuse cookie credentials on unsafe methods | `false` |
//! | `CORS_ALLOWED_ORIGINS` | Origin allow-list (empty: all) | Optional |
//! | `CORS_ALLOWED_METHODS` | Allowed methods | `GET,HEAD,POST,PUT,DELETE` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::str::FromStr;
use std::time::Duration;

use axum::http::Method;
use url::Url;

use crate::auth::verifier::SEKI_ISSUER;
use crate::auth::{PathPolicy, PathPolicyConfig, TokenStrategy};
use crate::cors::{CorsConfig, DEFAULT_ALLOWED_METHODS};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SEKI_URL_ENV: &str = "SEKI_URL";
pub const SEKI_TIMEOUT_ENV: &str = "SEKI_TIMEOUT_SECS";
pub const AUTH_ISSUERS_ENV: &str = "AUTH_ISSUERS";
pub const AUTH_SEKI_SECRET_ENV: &str = "AUTH_SEKI_SECRET";
pub const AUTH_JWKS_URLS_ENV: &str = "AUTH_JWKS_URLS";
pub const AUTH_AUDIENCES_ENV: &str = "AUTH_AUDIENCES";
pub const AUTH_TOKEN_STRATEGY_ENV: &str = "AUTH_TOKEN_STRATEGY";
pub const AUTH_SECURED_PATHS_ENV: &str = "AUTH_SECURED_PATHS";
pub const AUTH_ADDITIONAL_SECURED_PATHS_ENV: &str = "AUTH_ADDITIONAL_SECURED_PATHS";
pub const AUTH_PERMITTED_PATHS_ENV: &str = "AUTH_PERMITTED_PATHS";
pub const AUTH_ADDITIONAL_PERMITTED_PATHS_ENV: &str = "AUTH_ADDITIONAL_PERMITTED_PATHS";
pub const AUTH_MATCHED_PATHS_ENV: &str = "AUTH_MATCHED_PATHS";
pub const AUTH_ADDITIONAL_MATCHED_PATHS_ENV: &str = "AUTH_ADDITIONAL_MATCHED_PATHS";
pub const AUTH_SESSION_CREATION_POLICY_ENV: &str = "AUTH_SESSION_CREATION_POLICY";
pub const AUTH_CSRF_ENABLED_ENV: &str = "AUTH_CSRF_ENABLED";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const CORS_ALLOWED_METHODS_ENV: &str = "CORS_ALLOWED_METHODS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SEKI_TIMEOUT_SECS: u64 = 10;
/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}' (expected json or pretty)")),
        }
    }
}

/// Server-side session creation policy.
///
/// The gateway never creates sessions; anything other than `Stateless` is
/// accepted for compatibility and has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionCreationPolicy {
    Always,
    IfRequired,
    Never,
    #[default]
    Stateless,
}

impl FromStr for SessionCreationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Ok(SessionCreationPolicy::Always),
            "if_required" => Ok(SessionCreationPolicy::IfRequired),
            "never" => Ok(SessionCreationPolicy::Never),
            "stateless" => Ok(SessionCreationPolicy::Stateless),
            other => Err(format!("unknown session creation policy '{other}'")),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub seki_url: Url,
    pub seki_timeout: Duration,
    pub issuers: Vec<String>,
    pub seki_secret: Option<String>,
    /// `(issuer, jwks url)` pairs.
    pub jwks_urls: Vec<(String, String)>,
    pub audiences: Vec<String>,
    pub token_strategy: TokenStrategy,
    pub paths: PathPolicyConfig,
    pub session_creation_policy: SessionCreationPolicy,
    pub csrf_enabled: bool,
    pub cors: CorsConfig,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(var(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let seki_url = var(SEKI_URL_ENV).ok_or(ConfigError::Missing(SEKI_URL_ENV))?;
        let seki_url =
            Url::parse(&seki_url).map_err(|e| ConfigError::invalid(SEKI_URL_ENV, e.to_string()))?;
        let seki_timeout = Duration::from_secs(parse_or(
            var(SEKI_TIMEOUT_ENV),
            SEKI_TIMEOUT_ENV,
            DEFAULT_SEKI_TIMEOUT_SECS,
        )?);

        let issuers = var(AUTH_ISSUERS_ENV)
            .map(|v| split_list(&v))
            .unwrap_or_else(|| vec![SEKI_ISSUER.to_string()]);
        let jwks_urls = var(AUTH_JWKS_URLS_ENV)
            .map(|v| parse_jwks_urls(&v))
            .transpose()?
            .unwrap_or_default();

        let paths = PathPolicyConfig {
            secured_path_patterns: var(AUTH_SECURED_PATHS_ENV).map(|v| split_list(&v)),
            additional_secured_path_patterns: list(var(AUTH_ADDITIONAL_SECURED_PATHS_ENV)),
            permitted_path_patterns: var(AUTH_PERMITTED_PATHS_ENV).map(|v| split_list(&v)),
            additional_permitted_path_patterns: list(var(AUTH_ADDITIONAL_PERMITTED_PATHS_ENV)),
            matched_path_patterns: var(AUTH_MATCHED_PATHS_ENV).map(|v| split_list(&v)),
            additional_matched_path_patterns: list(var(AUTH_ADDITIONAL_MATCHED_PATHS_ENV)),
        };

        let allowed_methods = match var(CORS_ALLOWED_METHODS_ENV) {
            Some(v) => split_list(&v)
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                        .map_err(|e| ConfigError::invalid(CORS_ALLOWED_METHODS_ENV, e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_ALLOWED_METHODS.to_vec(),
        };
        let cors = CorsConfig {
            allowed_origins: list(var(CORS_ALLOWED_ORIGINS_ENV)),
            allowed_methods,
        };
        cors.validate()
            .map_err(|reason| ConfigError::invalid(CORS_ALLOWED_ORIGINS_ENV, reason))?;

        let config = Self {
            host,
            port,
            seki_url,
            seki_timeout,
            issuers,
            seki_secret: var(AUTH_SEKI_SECRET_ENV),
            jwks_urls,
            audiences: list(var(AUTH_AUDIENCES_ENV)),
            token_strategy: parse_or(
                var(AUTH_TOKEN_STRATEGY_ENV),
                AUTH_TOKEN_STRATEGY_ENV,
                TokenStrategy::Auto,
            )?,
            paths,
            session_creation_policy: parse_or(
                var(AUTH_SESSION_CREATION_POLICY_ENV),
                AUTH_SESSION_CREATION_POLICY_ENV,
                SessionCreationPolicy::Stateless,
            )?,
            csrf_enabled: parse_or(var(AUTH_CSRF_ENABLED_ENV), AUTH_CSRF_ENABLED_ENV, false)?,
            cors,
            log_format: parse_or(var(LOG_FORMAT_ENV), LOG_FORMAT_ENV, LogFormat::Pretty)?,
        };

        // Surface bad patterns at startup rather than on the first request.
        config.path_policy()?;
        Ok(config)
    }

    /// Compiled path policy.
    pub fn path_policy(&self) -> Result<PathPolicy, ConfigError> {
        PathPolicy::from_config(&self.paths)
            .map_err(|e| {
                ConfigError::invalid(AUTH_SECURED_PATHS_ENV, format!("bad path pattern: {e}"))
            })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log settings that are accepted but do nothing.
    pub fn warn_ineffective(&self) {
        if self.session_creation_policy != SessionCreationPolicy::Stateless {
            tracing::warn!(
                policy = ?self.session_creation_policy,
                "session creation policy has no effect; the gateway never creates sessions"
            );
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn list(value: Option<String>) -> Vec<String> {
    value.map(|v| split_list(&v)).unwrap_or_default()
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::invalid(var, e.to_string())),
        None => Ok(default),
    }
}

fn parse_jwks_urls(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    split_list(value)
        .into_iter()
        .map(|pair| {
            let (issuer, url) = pair
                .split_once('=')
                .ok_or_else(|| {
                    ConfigError::invalid(
                        AUTH_JWKS_URLS_ENV,
                        format!("expected issuer=url, got '{pair}'"),
                    )
                })?;
            Url::parse(url.trim())
                .map_err(|e| ConfigError::invalid(AUTH_JWKS_URLS_ENV, format!("{url}: {e}")))?;
            Ok((issuer.trim().to_string(), url.trim().to_string()))
        })
        .collect()
}
