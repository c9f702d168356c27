// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Signing keys for non-Seki issuers are resolved through a JWKS endpoint
//! per issuer. Only the key material is cached; every token is still
//! verified on every request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::verifier::KeySource;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum KeySourceError {
    #[error("no key source configured for issuer {0}")]
    UnknownIssuer(String),

    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("no matching key found in JWKS")]
    NoMatchingKey,

    #[error("unsupported key in JWKS: {0}")]
    UnsupportedKey(String),
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching, for a single endpoint.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    client: reqwest::Client,
}

impl JwksManager {
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, KeySourceError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| KeySourceError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client,
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, KeySourceError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CacheEntry {
                jwks: jwks.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(jwks)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, KeySourceError> {
        tracing::debug!(url = %self.jwks_url, "fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeySourceError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeySourceError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySourceError::Fetch(e.to_string()))
    }

    /// Decoding key for `kid`, or the first usable key when the token has none.
    pub async fn get_decoding_key(
        &self,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), KeySourceError> {
        let jwks = self.get_jwks().await?;

        match kid {
            Some(kid) => {
                let jwk = jwks
                    .keys
                    .iter()
                    .find(|k| k.common.key_id.as_deref() == Some(kid))
                    .ok_or(KeySourceError::NoMatchingKey)?;
                jwk_to_decoding_key(jwk)
            }
            None => jwks
                .keys
                .iter()
                .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
                .ok_or(KeySourceError::NoMatchingKey),
        }
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
    }
}

/// Per-issuer JWKS endpoints.
#[derive(Clone, Default)]
pub struct JwksKeySource {
    managers: HashMap<String, JwksManager>,
}

impl JwksKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>, manager: JwksManager) -> Self {
        self.managers.insert(issuer.into(), manager);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[async_trait]
impl KeySource for JwksKeySource {
    async fn decoding_key(
        &self,
        issuer: &str,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), KeySourceError> {
        let manager = self
            .managers
            .get(issuer)
            .ok_or_else(|| KeySourceError::UnknownIssuer(issuer.to_string()))?;
        manager.get_decoding_key(kid).await
    }

    fn has_issuer(&self, issuer: &str) -> bool {
        self.managers.contains_key(issuer)
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), KeySourceError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| KeySourceError::UnsupportedKey(format!("RSA: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                _ => Algorithm::RS256,
            };
            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| KeySourceError::UnsupportedKey(format!("EC: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };
            Ok((key, alg))
        }
        AlgorithmParameters::OctetKey(oct) => {
            let key = DecodingKey::from_base64_secret(&oct.value)
                .map_err(|e| KeySourceError::UnsupportedKey(format!("oct: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::HS384) => Algorithm::HS384,
                Some(KeyAlgorithm::HS512) => Algorithm::HS512,
                _ => Algorithm::HS256,
            };
            Ok((key, alg))
        }
        _ => Err(KeySourceError::UnsupportedKey("unsupported key type".to_string())),
    }
}
