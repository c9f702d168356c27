// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route authorization guards.
//!
//! A guard inspects the authenticated principal and the matched route and
//! either lets the request through or rejects it with `Forbidden` (403).
//! Guards are registered per route with `route_layer`, so they run after
//! routing (path parameters are known) and after authentication.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/api/tenants/{tenantId}/me", get(me))
//!     .route_layer(from_fn_with_state(require_same_tenant(), guard_middleware))
//!     .route_layer(from_fn_with_state(require_authority("tenant:read"), guard_middleware))
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedPrincipal};

/// Path parameter compared against the principal's tenant.
pub const TENANT_PATH_PARAM: &str = "tenantId";

/// Route information available to guards.
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    path: String,
    params: HashMap<String, String>,
}

impl RouteMetadata {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Authorization check evaluated against a principal and its route.
pub trait Guard: Send + Sync {
    fn check(
        &self,
        principal: &AuthenticatedPrincipal,
        route: &RouteMetadata,
    ) -> Result<(), AuthError>;
}

/// Principal must carry the given authority.
#[derive(Debug, Clone)]
pub struct RequireAuthority(pub String);

impl Guard for RequireAuthority {
    fn check(
        &self,
        principal: &AuthenticatedPrincipal,
        route: &RouteMetadata,
    ) -> Result<(), AuthError> {
        if principal.has_authority(&self.0) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "missing authority {} for {}",
                self.0,
                route.path()
            )))
        }
    }
}

/// Principal's tenant must equal the route's `{tenantId}` parameter.
#[derive(Debug, Clone, Default)]
pub struct RequireSameTenant;

impl Guard for RequireSameTenant {
    fn check(
        &self,
        principal: &AuthenticatedPrincipal,
        route: &RouteMetadata,
    ) -> Result<(), AuthError> {
        match route.param(TENANT_PATH_PARAM) {
            Some(tenant) if tenant == principal.tenant_id() => Ok(()),
            Some(_) => Err(AuthError::Forbidden(format!(
                "tenant of {} does not match the authenticated principal",
                route.path()
            ))),
            None => Err(AuthError::Forbidden(format!(
                "route {} has no {TENANT_PATH_PARAM} parameter",
                route.path()
            ))),
        }
    }
}

pub fn require_authority(authority: impl Into<String>) -> Arc<dyn Guard> {
    Arc::new(RequireAuthority(authority.into()))
}

pub fn require_same_tenant() -> Arc<dyn Guard> {
    Arc::new(RequireSameTenant)
}

/// Middleware evaluating one guard. Use with `from_fn_with_state` on
/// `route_layer`.
pub async fn guard_middleware(
    State(guard): State<Arc<dyn Guard>>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = request.extensions().get::<AuthenticatedPrincipal>() else {
        return AuthError::MissingCredential.into_response();
    };

    let route = params.iter().fold(
        RouteMetadata::new(request.uri().path()),
        |route, (name, value)| route.with_param(name, value),
    );

    if let Err(e) = guard.check(principal, &route) {
        return e.into_response();
    }

    next.run(request).await
}
