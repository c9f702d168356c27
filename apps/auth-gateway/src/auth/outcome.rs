// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Result of validating a single credential.

use super::verifier::VerifiedClaims;
use crate::seki::{SekiError, SessionValidation};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Provider-specific identity produced by a successful validation.
#[derive(Debug, Clone)]
pub enum ValidatedIdentity {
    /// Opaque session accepted by Seki.
    Session(SessionValidation),
    /// Signed token verified locally.
    SignedToken(VerifiedClaims),
}

/// Tagged validation result.
///
/// `InvalidToken` is an expected outcome of bad client credentials;
/// `ProviderError` means the identity source itself could not answer.
#[derive(Debug)]
pub enum ValidationOutcome {
    Valid(ValidatedIdentity),
    InvalidToken(String),
    ProviderError(BoxError),
}

impl From<Result<SessionValidation, SekiError>> for ValidationOutcome {
    fn from(result: Result<SessionValidation, SekiError>) -> Self {
        match result {
            Ok(session) => ValidationOutcome::Valid(ValidatedIdentity::Session(session)),
            Err(SekiError::InvalidToken) => {
                ValidationOutcome::InvalidToken("session token rejected by Seki".to_string())
            }
            Err(e) => ValidationOutcome::ProviderError(Box::new(e)),
        }
    }
}
