// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Seki Identity Provider
//!
//! Client for the central Seki identity service, which validates opaque
//! session tokens.
//!
//! ## Wire Protocol
//!
//! - `GET {base}session/validate?token={token}`
//!   - `200` with `{"user": {...}, "user_session": {...}}` for a live session
//!   - `401` with exactly `{"error":"Unauthorized"}` when the token is rejected
//!   - anything else is a provider failure
//! - `GET {base}health` → `{"alive": true}`

pub mod client;
pub mod models;

use async_trait::async_trait;

pub use client::{SekiClient, SekiError};
pub use models::{HealthStatus, ProviderHealth, SekiUser, SekiUserSession, SessionValidation};

/// Identity provider capability consumed by the authentication pipeline.
///
/// `SekiClient` is the production implementation; tests substitute stubs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate an opaque session token.
    async fn validate(&self, token: &str) -> Result<SessionValidation, SekiError>;

    /// Probe the provider. Never fails; errors are folded into a down status.
    async fn check_health(&self) -> ProviderHealth;
}

#[async_trait]
impl IdentityProvider for SekiClient {
    async fn validate(&self, token: &str) -> Result<SessionValidation, SekiError> {
        SekiClient::validate(self, token).await
    }

    async fn check_health(&self) -> ProviderHealth {
        SekiClient::check_health(self).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Responder = Box<dyn Fn(&str) -> Result<SessionValidation, SekiError> + Send + Sync>;

    /// In-process identity provider that counts validation calls.
    pub(crate) struct StubProvider {
        respond: Responder,
        healthy: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        pub(crate) fn new(
            respond: impl Fn(&str) -> Result<SessionValidation, SekiError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                healthy: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn unhealthy(mut self) -> Self {
            self.healthy = false;
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn validate(&self, token: &str) -> Result<SessionValidation, SekiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(token)
        }

        async fn check_health(&self) -> ProviderHealth {
            if self.healthy {
                ProviderHealth::up()
            } else {
                ProviderHealth::down("stub provider is down")
            }
        }
    }
}
