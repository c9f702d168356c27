// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local verification of signed bearer tokens (JWT).
//!
//! The Seki sentinel issuer is verified with a shared HMAC secret; every
//! other trusted issuer resolves its key through a pluggable [`KeySource`].

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::jwks::KeySourceError;
use super::outcome::{ValidatedIdentity, ValidationOutcome};

/// Issuer name standing for the Seki identity provider itself.
pub const SEKI_ISSUER: &str = "Seki";

/// Resolves signing keys for non-sentinel issuers.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn decoding_key(
        &self,
        issuer: &str,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), KeySourceError>;

    /// Whether keys for `issuer` can be looked up at all.
    fn has_issuer(&self, issuer: &str) -> bool;
}

/// Claims accepted from a verified token.
///
/// Identity claims are accepted in snake_case, camelCase, or the
/// lowercase form older issuers emit. Anything else lands in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedClaims {
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, alias = "tenantId", alias = "tenantid")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "userId", alias = "userid")]
    pub user_id: Option<String>,
    #[serde(default, alias = "udpId", alias = "udpid")]
    pub udp_id: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default, alias = "userType")]
    pub user_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Just enough of the payload to pick a key.
#[derive(Debug, Deserialize)]
struct IssuerPeek {
    #[serde(default)]
    iss: Option<String>,
}

/// Signed-token verifier.
#[derive(Clone)]
pub struct JwtVerifier {
    trusted_issuers: Vec<String>,
    seki_secret: Option<Vec<u8>>,
    audiences: Vec<String>,
    key_source: Option<Arc<dyn KeySource>>,
}

impl JwtVerifier {
    pub fn new(trusted_issuers: Vec<String>) -> Self {
        Self {
            trusted_issuers,
            seki_secret: None,
            audiences: Vec::new(),
            key_source: None,
        }
    }

    /// Shared secret for the Seki sentinel issuer.
    pub fn with_seki_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.seki_secret = Some(secret.into());
        self
    }

    /// Valid audiences; empty means audience is not checked.
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }

    pub fn with_key_source(mut self, key_source: Arc<dyn KeySource>) -> Self {
        self.key_source = Some(key_source);
        self
    }

    pub fn trusted_issuers(&self) -> &[String] {
        &self.trusted_issuers
    }

    /// Whether key material is configured for the token's (unverified)
    /// issuer. Untrusted or unreadable issuers answer `false`.
    pub fn has_key_for(&self, token: &str) -> bool {
        let Some(issuer) = jsonwebtoken::dangerous::insecure_decode::<IssuerPeek>(token)
            .ok()
            .and_then(|data| data.claims.iss)
        else {
            return false;
        };
        if !self.trusted_issuers.contains(&issuer) {
            return false;
        }
        if issuer == SEKI_ISSUER {
            self.seki_secret.is_some()
        } else {
            self.key_source
                .as_ref()
                .is_some_and(|source| source.has_issuer(&issuer))
        }
    }

    /// Verify signature, issuer, audience and expiry.
    pub async fn verify(&self, token: &str) -> ValidationOutcome {
        let header = match decode_header(token) {
            Ok(header) => header,
            Err(_) => return ValidationOutcome::InvalidToken("malformed token".to_string()),
        };

        // Issuer selects the key, so it is read before the signature is checked.
        let issuer = match jsonwebtoken::dangerous::insecure_decode::<IssuerPeek>(token) {
            Ok(data) => data.claims.iss,
            Err(_) => return ValidationOutcome::InvalidToken("malformed token".to_string()),
        };
        let Some(issuer) = issuer else {
            return ValidationOutcome::InvalidToken("token has no issuer".to_string());
        };
        if !self.trusted_issuers.iter().any(|i| *i == issuer) {
            return ValidationOutcome::InvalidToken(format!("untrusted issuer {issuer}"));
        }

        let resolved = self
            .resolve_key(&issuer, header.kid.as_deref(), header.alg)
            .await;
        let (key, algorithm) = match resolved {
            Ok(resolved) => resolved,
            Err(outcome) => return outcome,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        if self.audiences.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(self.audiences.as_slice());
        }

        match decode::<VerifiedClaims>(token, &key, &validation) {
            Ok(data) => ValidationOutcome::Valid(ValidatedIdentity::SignedToken(data.claims)),
            Err(e) => classify_decode_error(e),
        }
    }

    async fn resolve_key(
        &self,
        issuer: &str,
        kid: Option<&str>,
        header_alg: Algorithm,
    ) -> Result<(DecodingKey, Algorithm), ValidationOutcome> {
        if issuer == SEKI_ISSUER {
            let secret = self.seki_secret.as_deref().ok_or_else(|| {
                ValidationOutcome::ProviderError(
                    "no shared secret configured for the Seki issuer".into(),
                )
            })?;
            return match header_alg {
                Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                    Ok((DecodingKey::from_secret(secret), header_alg))
                }
                other => Err(ValidationOutcome::InvalidToken(format!(
                    "unexpected algorithm {other:?} for the Seki issuer"
                ))),
            };
        }

        let source = self.key_source.as_ref().ok_or_else(|| {
            ValidationOutcome::ProviderError(
                KeySourceError::UnknownIssuer(issuer.to_string()).into(),
            )
        })?;

        source.decoding_key(issuer, kid).await.map_err(|e| match e {
            KeySourceError::NoMatchingKey => {
                ValidationOutcome::InvalidToken("no matching signing key".to_string())
            }
            other => ValidationOutcome::ProviderError(Box::new(other)),
        })
    }
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> ValidationOutcome {
    let reason = match err.kind() {
        ErrorKind::ExpiredSignature => "token expired".to_string(),
        ErrorKind::InvalidSignature => "invalid signature".to_string(),
        ErrorKind::InvalidIssuer => "untrusted issuer".to_string(),
        ErrorKind::InvalidAudience => "audience mismatch".to_string(),
        ErrorKind::ImmatureSignature => "token not yet valid".to_string(),
        ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim {claim}"),
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => "malformed token".to_string(),
        _ => return ValidationOutcome::ProviderError(Box::new(err)),
    };
    ValidationOutcome::InvalidToken(reason)
}
