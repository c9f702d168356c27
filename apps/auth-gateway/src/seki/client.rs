// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the Seki session validation endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use super::models::{AliveResponse, ProviderHealth, SessionValidation};

/// Default request timeout for Seki calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exact body Seki returns for a rejected session token.
///
/// Only this literal body is treated as an invalid token. Any other `401`
/// body means the gateway itself could not talk to Seki and is reported as
/// a provider failure.
pub const INVALID_TOKEN_BODY: &str = r#"{"error":"Unauthorized"}"#;

const VALIDATE_PATH: &str = "session/validate";
const HEALTH_PATH: &str = "health";

#[derive(Debug, thiserror::Error)]
pub enum SekiError {
    #[error("Seki base URL is invalid: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Seki rejected the session token")]
    InvalidToken,

    #[error("Seki returned HTTP {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("Seki request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Seki response could not be decoded: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

/// Seki client.
///
/// Holds a normalized base URL (always ending in `/`) and a pooled
/// `reqwest` client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SekiClient {
    base_url: Url,
    http: Client,
}

impl SekiClient {
    /// Create a client with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, SekiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, SekiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validate an opaque session token.
    ///
    /// No retries: a failed call is surfaced to the caller immediately.
    pub async fn validate(&self, token: &str) -> Result<SessionValidation, SekiError> {
        let url = self.base_url.join(VALIDATE_PATH)?;
        let response = self
            .http
            .get(url)
            .query(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::OK => serde_json::from_str(&body)
                .map_err(|source| SekiError::Decode { source, body }),
            StatusCode::UNAUTHORIZED if body == INVALID_TOKEN_BODY => Err(SekiError::InvalidToken),
            _ => Err(SekiError::UnexpectedStatus { status, body }),
        }
    }

    /// Probe `GET health`. Every failure becomes a down status.
    pub async fn check_health(&self) -> ProviderHealth {
        match self.fetch_alive().await {
            Ok(true) => ProviderHealth::up(),
            Ok(false) => ProviderHealth::down("Seki reported alive=false"),
            Err(e) => {
                tracing::warn!(error = %e, "Seki health check failed");
                ProviderHealth::down(e.to_string())
            }
        }
    }

    async fn fetch_alive(&self) -> Result<bool, SekiError> {
        let url = self.base_url.join(HEALTH_PATH)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SekiError::UnexpectedStatus { status, body });
        }

        let alive: AliveResponse =
            serde_json::from_str(&body).map_err(|source| SekiError::Decode { source, body })?;
        Ok(alive.alive)
    }
}

/// Parse a base URL, appending a trailing slash so relative joins keep
/// any path prefix (`https://host/seki` + `health` → `https://host/seki/health`).
fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}
