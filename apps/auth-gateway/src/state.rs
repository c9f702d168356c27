// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{Authenticator, JwksKeySource, JwksManager, JwtVerifier, TokenStrategy};
use crate::config::{ConfigError, GatewayConfig, AUTH_JWKS_URLS_ENV, SEKI_URL_ENV};
use crate::cors::CorsConfig;
use crate::seki::{IdentityProvider, SekiClient};

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Authenticator,
    pub provider: Arc<dyn IdentityProvider>,
    pub cors: CorsConfig,
}

impl AppState {
    pub fn new(authenticator: Authenticator) -> Self {
        Self {
            provider: authenticator.provider().clone(),
            authenticator,
            cors: CorsConfig::default(),
        }
    }

    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Wire the Seki client, verifier and path policy from configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let seki = SekiClient::with_timeout(config.seki_url.as_str(), config.seki_timeout).map_err(
            |e| ConfigError::Invalid {
                var: SEKI_URL_ENV,
                reason: e.to_string(),
            },
        )?;

        let mut authenticator = Authenticator::new(config.path_policy()?, Arc::new(seki))
            .with_strategy(config.token_strategy)
            .with_csrf(config.csrf_enabled);
        if config.token_strategy != TokenStrategy::Seki {
            authenticator = authenticator.with_verifier(build_verifier(config)?);
        }

        Ok(Self::new(authenticator).with_cors(config.cors.clone()))
    }
}

fn build_verifier(config: &GatewayConfig) -> Result<JwtVerifier, ConfigError> {
    let mut verifier =
        JwtVerifier::new(config.issuers.clone()).with_audiences(config.audiences.clone());
    if let Some(secret) = &config.seki_secret {
        verifier = verifier.with_seki_secret(secret.as_bytes());
    }

    let mut keys = JwksKeySource::new();
    for (issuer, url) in &config.jwks_urls {
        let manager = JwksManager::new(url.as_str()).map_err(|e| ConfigError::Invalid {
            var: AUTH_JWKS_URLS_ENV,
            reason: e.to_string(),
        })?;
        keys = keys.with_issuer(issuer.as_str(), manager);
    }
    if !keys.is_empty() {
        verifier = verifier.with_key_source(Arc::new(keys));
    }
    Ok(verifier)
}
