// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-principal endpoints.

use axum::{extract::Path, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedPrincipal};
use crate::error::ErrorResponse;

/// Response for GET /api/me
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMeResponse {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_id: Option<String>,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_full_name: String,
    pub authenticated: bool,
    pub authorities: Vec<String>,
}

impl From<&AuthenticatedPrincipal> for UserMeResponse {
    fn from(principal: &AuthenticatedPrincipal) -> Self {
        Self {
            tenant_id: principal.tenant_id().to_string(),
            user_id: principal.user_id().to_string(),
            udp_id: principal.udp_id().map(str::to_string),
            user_first_name: principal.user_first_name().to_string(),
            user_last_name: principal.user_last_name().to_string(),
            user_full_name: principal.user_full_name().to_string(),
            authenticated: principal.is_authenticated(),
            authorities: principal.authorities().to_vec(),
        }
    }
}

/// Get the current authenticated principal.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Authenticated principal", body = UserMeResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
    )
)]
pub async fn get_current_user(Auth(principal): Auth) -> Json<UserMeResponse> {
    Json(UserMeResponse::from(&principal))
}

/// Get the current principal scoped to its own tenant.
///
/// Guarded: the principal must hold `tenant:read` and belong to `tenantId`.
#[utoipa::path(
    get,
    path = "/api/tenants/{tenantId}/me",
    tag = "Users",
    security(("bearer" = [])),
    params(("tenantId" = String, Path, description = "Tenant the caller belongs to")),
    responses(
        (status = 200, description = "Authenticated principal", body = UserMeResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Other tenant or missing authority", body = ErrorResponse),
    )
)]
pub async fn get_tenant_user(
    Path(_tenant_id): Path<String>,
    Auth(principal): Auth,
) -> Json<UserMeResponse> {
    Json(UserMeResponse::from(&principal))
}
