// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seki response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Successful `session/validate` response body.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionValidation {
    pub user: SekiUser,
    pub user_session: SekiUserSession,
}

/// User record returned by Seki (snake_case on the wire).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SekiUser {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub udp_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub preferred_timezone: Option<String>,
}

/// Session attached to a validated token.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SekiUserSession {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Opaque provider metadata (user type, authorities, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `GET health` response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AliveResponse {
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Result of probing the identity provider.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderHealth {
    pub status: HealthStatus,
    /// Error that caused a down status, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderHealth {
    pub fn up() -> Self {
        Self {
            status: HealthStatus::Up,
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}
