// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential extraction from inbound requests.
//!
//! Two transports are recognized, at most one is honored:
//!
//! 1. `Authorization: Bearer <token>` (preferred)
//! 2. `Cookie: user_session_token_<state>=<token>` paired with `X-STATE: <state>`

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

/// Session cookie name prefix; the state value completes the name.
pub const SESSION_COOKIE_PREFIX: &str = "user_session_token_";
/// Header carrying the state that selects the session cookie.
pub const STATE_HEADER: &str = "x-state";

/// Authorization scheme, matched case-insensitively.
const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    AuthorizationHeader,
    SessionCookie,
}

/// Raw credential pulled from a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Extract the request credential, header first, then cookie.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    bearer_token(headers)
        .map(|token| Credential {
            token,
            source: CredentialSource::AuthorizationHeader,
        })
        .or_else(|| {
            session_cookie_token(headers).map(|token| Credential {
                token,
                source: CredentialSource::SessionCookie,
            })
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn session_cookie_token(headers: &HeaderMap) -> Option<String> {
    let state = headers.get(STATE_HEADER)?.to_str().ok()?.trim();
    if state.is_empty() {
        return None;
    }

    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(&format!("{SESSION_COOKIE_PREFIX}{state}"))?;
    let token = cookie.value().trim();
    (!token.is_empty()).then(|| token.to_string())
}
