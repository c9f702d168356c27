// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token / session authentication for the Ronin gateway.
//!
//! ## Auth Flow
//!
//! 1. The path policy classifies the request path
//! 2. Secured paths must carry `Authorization: Bearer <token>`, or the
//!    `user_session_token_<state>` cookie plus `X-STATE: <state>`
//! 3. The gateway validates the token:
//!    - opaque session tokens against Seki (`session/validate`)
//!    - signed tokens locally (signature, issuer, audience, expiry)
//! 4. The result is normalized into an [`AuthenticatedPrincipal`]
//!
//! ## Failure contract
//!
//! - Missing credential, invalid token and provider failure are all 401
//! - Guards rejecting an authenticated principal yield 403
//! - Nothing is cached or retried; every secured request validates afresh
//! - JWKS key material is cached with a TTL, the tokens themselves are not

pub mod context;
pub mod credential;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod jwks;
pub mod middleware;
pub mod outcome;
pub mod policy;
pub mod principal;
pub mod verifier;

pub use error::{AuthError, AUTHENTICATION_ERROR, AUTHORIZATION_ERROR};
pub use extractor::{Auth, OptionalAuth};
pub use guard::{guard_middleware, require_authority, require_same_tenant, Guard};
pub use jwks::{JwksKeySource, JwksManager};
pub use middleware::{auth_middleware, Authenticator, TokenStrategy};
pub use outcome::ValidationOutcome;
pub use policy::{PathClass, PathPolicy, PathPolicyConfig};
pub use principal::AuthenticatedPrincipal;
pub use verifier::{JwtVerifier, KeySource, SEKI_ISSUER};
