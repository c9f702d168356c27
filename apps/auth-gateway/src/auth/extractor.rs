// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated principal.
//!
//! The authentication middleware inserts the principal into request
//! extensions for secured paths; these extractors read it back.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     principal.tenant_id().to_string()
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedPrincipal};

/// Extractor requiring an authenticated principal.
///
/// Rejects with `MissingCredential` (401) when the request was not
/// authenticated, e.g. a handler mounted on a public or unmatched path.
pub struct Auth(pub AuthenticatedPrincipal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Optional authentication extractor.
///
/// Yields `None` instead of rejecting when no principal is attached.
pub struct OptionalAuth(pub Option<AuthenticatedPrincipal>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts.extensions.get::<AuthenticatedPrincipal>().cloned(),
        ))
    }
}
