// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CORS policy.
//!
//! `CorsLayer` answers preflights and sets the response headers. The origin
//! gate in front of it refuses cross-origin requests from origins outside a
//! configured allow-list, so they never reach authentication or handlers.
//! Requests without `Origin`, and same-origin requests, are left alone.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use url::Url;

pub const DEFAULT_ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
];

const INVALID_CORS_REQUEST: &str = "Invalid CORS request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: DEFAULT_ALLOWED_METHODS.to_vec(),
        }
    }
}

impl CorsConfig {
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Every origin must be an absolute `scheme://host[:port]`.
    pub fn validate(&self) -> Result<(), String> {
        for origin in &self.allowed_origins {
            let url = Url::parse(origin).map_err(|e| format!("bad origin '{origin}': {e}"))?;
            if url.host_str().is_none() {
                return Err(format!("bad origin '{origin}': no host"));
            }
            HeaderValue::from_str(origin).map_err(|e| format!("bad origin '{origin}': {e}"))?;
        }
        Ok(())
    }

    fn is_restricted(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
    }
}

/// Build the CORS response layer.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.is_restricted() {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok()),
        )
    } else {
        AllowOrigin::from(Any)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(config.allowed_methods.clone())
        .allow_headers(Any)
}

/// Reject cross-origin requests from origins outside the allow-list.
pub async fn origin_gate(
    State(config): State<CorsConfig>,
    request: Request,
    next: Next,
) -> Response {
    if !config.is_restricted() {
        return next.run(request).await;
    }

    let Some(origin) = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
    else {
        return next.run(request).await;
    };

    if config.allows(origin) || is_same_origin(origin, request.headers()) {
        return next.run(request).await;
    }

    tracing::debug!(%origin, "rejecting cross-origin request");
    (StatusCode::FORBIDDEN, INVALID_CORS_REQUEST).into_response()
}

fn is_same_origin(origin: &str, headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    let Some(origin_host) = url.host_str() else {
        return false;
    };
    let authority = match url.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host)
}
