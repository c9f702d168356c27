// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::outcome::BoxError;
use crate::error::ErrorResponse;

/// Message carried by every 401 response.
pub const AUTHENTICATION_ERROR: &str = "Authentication Error";
/// Message carried by every 403 response.
pub const AUTHORIZATION_ERROR: &str = "Authorization Error";

/// Authentication / authorization failure.
///
/// Every authentication failure surfaces as 401 so callers see a single
/// "not authenticated" contract; only the log severity differs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer header and no session cookie / state header pair.
    #[error("No credentials were supplied with the request")]
    MissingCredential,

    /// Credential was checked and rejected.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Identity provider or key source could not be consulted.
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(#[source] BoxError),

    /// Authenticated, but not allowed.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Cookie credential used on an unsafe method while CSRF protection is on.
    #[error("Cookie credentials are not accepted for {0} requests")]
    CsrfRejected(String),
}

impl AuthError {
    /// Classifier written to `ErrorResponse.exception`.
    pub fn exception(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MissingCredentialException",
            AuthError::InvalidToken(_) => "InvalidTokenException",
            AuthError::ProviderUnavailable(_) => "ProviderUnavailableException",
            AuthError::Forbidden(_) => "ForbiddenException",
            AuthError::CsrfRejected(_) => "CsrfRejectedException",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidToken(_)
            | AuthError::ProviderUnavailable(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) | AuthError::CsrfRejected(_) => StatusCode::FORBIDDEN,
        }
    }

    fn log(&self) {
        let exception = self.exception();
        match self {
            AuthError::ProviderUnavailable(cause) => {
                tracing::error!(error = %cause, exception, "identity provider failure");
            }
            AuthError::MissingCredential | AuthError::InvalidToken(_) => {
                tracing::debug!(reason = %self, exception, "authentication rejected");
            }
            AuthError::Forbidden(_) | AuthError::CsrfRejected(_) => {
                tracing::info!(reason = %self, exception, "authorization rejected");
            }
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        let message = if status == StatusCode::FORBIDDEN {
            AUTHORIZATION_ERROR
        } else {
            AUTHENTICATION_ERROR
        };
        ErrorResponse::new(status, err.exception(), message)
            .with_detail(err.to_string())
            .with_cause(&err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        ErrorResponse::from(self).into_response()
    }
}
