// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::seki::{HealthStatus, ProviderHealth};
use crate::state::AppState;

/// Health check response with the identity provider status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status; `DOWN` when Seki is unreachable.
    pub status: HealthStatus,
    /// Seki health check result.
    pub seki: ProviderHealth,
}

/// Health check endpoint handler.
///
/// Returns 200 when Seki answers alive, 503 otherwise.
#[utoipa::path(
    get,
    path = "/actuator/health",
    tag = "Health",
    responses(
        (status = 200, description = "Gateway and Seki are healthy", body = HealthResponse),
        (status = 503, description = "Seki is unavailable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let seki = state.provider.check_health().await;
    let status = if seki.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: seki.status,
            seki,
        }),
    )
}
