// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Normalized authenticated identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::outcome::{ValidatedIdentity, ValidationOutcome};
use super::verifier::{VerifiedClaims, SEKI_ISSUER};
use super::AuthError;
use crate::seki::SessionValidation;

/// Session metadata key holding the user type.
const USER_TYPE_KEY: &str = "user_type";
/// Session metadata key holding granted authorities.
const AUTHORITIES_KEY: &str = "authorities";

/// Where the principal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalSource {
    /// Opaque session validated by Seki.
    Seki,
    /// Locally verified signed token.
    SignedToken,
}

/// Raw credential, redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Authenticated identity handed to application code.
///
/// Immutable once built and scoped to a single request. `tenant_id` and
/// `user_id` are always non-empty; name fields are `""` when the provider
/// had nothing, never absent.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    tenant_id: String,
    user_id: String,
    udp_id: Option<String>,
    first_name: String,
    last_name: String,
    full_name: String,
    authenticated: bool,
    user_type: Option<String>,
    authorities: Vec<String>,
    source: PrincipalSource,
    issuer: String,
    expires_at: Option<DateTime<Utc>>,
    metadata: Map<String, Value>,
    token: SessionToken,
}

impl AuthenticatedPrincipal {
    /// Turn a validation outcome into a principal.
    ///
    /// Only `Valid` outcomes yield a principal; the other variants map onto
    /// the matching `AuthError`.
    pub fn normalize(outcome: ValidationOutcome, token: &str) -> Result<Self, AuthError> {
        let principal = match outcome {
            ValidationOutcome::Valid(ValidatedIdentity::Session(session)) => {
                Self::from_session(session, token)
            }
            ValidationOutcome::Valid(ValidatedIdentity::SignedToken(claims)) => {
                Self::from_claims(claims, token)
            }
            ValidationOutcome::InvalidToken(reason) => return Err(AuthError::InvalidToken(reason)),
            ValidationOutcome::ProviderError(cause) => {
                return Err(AuthError::ProviderUnavailable(cause))
            }
        };

        if principal.tenant_id.is_empty() || principal.user_id.is_empty() {
            return Err(AuthError::InvalidToken(
                "validated identity is missing tenant or user id".to_string(),
            ));
        }
        Ok(principal)
    }

    fn from_session(session: SessionValidation, token: &str) -> Self {
        let SessionValidation { user, user_session } = session;
        let metadata = user_session.metadata;

        Self {
            tenant_id: user.tenant_id,
            user_id: user.id,
            udp_id: non_empty(user.udp_id),
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            full_name: user.full_name.unwrap_or_default(),
            authenticated: true,
            user_type: metadata
                .get(USER_TYPE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string),
            authorities: string_list(metadata.get(AUTHORITIES_KEY)),
            source: PrincipalSource::Seki,
            issuer: SEKI_ISSUER.to_string(),
            expires_at: user_session.expires_at,
            metadata,
            token: SessionToken(token.to_string()),
        }
    }

    fn from_claims(claims: VerifiedClaims, token: &str) -> Self {
        let mut authorities = claims.authorities;
        if let Some(scope) = &claims.scope {
            authorities.extend(scope.split_whitespace().map(str::to_string));
        }

        Self {
            tenant_id: claims.tenant_id.unwrap_or_default(),
            user_id: claims.user_id.or(claims.sub).unwrap_or_default(),
            udp_id: non_empty(claims.udp_id),
            first_name: claims.first_name.unwrap_or_default(),
            last_name: claims.last_name.unwrap_or_default(),
            full_name: claims.full_name.unwrap_or_default(),
            authenticated: true,
            user_type: claims.user_type,
            authorities,
            source: PrincipalSource::SignedToken,
            issuer: claims.iss,
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            metadata: claims.extra,
            token: SessionToken(token.to_string()),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn udp_id(&self) -> Option<&str> {
        self.udp_id.as_deref()
    }

    pub fn user_first_name(&self) -> &str {
        &self.first_name
    }

    pub fn user_last_name(&self) -> &str {
        &self.last_name
    }

    pub fn user_full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user_type(&self) -> Option<&str> {
        self.user_type.as_deref()
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn source(&self) -> PrincipalSource {
        self.source
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
