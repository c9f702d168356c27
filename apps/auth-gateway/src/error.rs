// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured error body shared by every failing route.

use std::error::Error as StdError;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wire error entity.
///
/// `None` fields are omitted, never emitted as `null`. The stack trace is
/// only populated for 5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Canonical status name, e.g. `UNAUTHORIZED`.
    pub http_status: String,
    pub timestamp: DateTime<Utc>,
    /// Numeric status code.
    pub status: u16,
    /// Reason phrase, e.g. `Unauthorized`.
    pub error: String,
    /// Failure classifier, e.g. `InvalidTokenException`.
    pub exception: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl ErrorResponse {
    pub fn new(
        status: StatusCode,
        exception: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        Self {
            http_status: status_name(reason),
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: reason.to_string(),
            exception: exception.into(),
            message: message.into(),
            detail: None,
            stacktrace: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the cause chain of `err` as the stack trace (5xx only).
    pub fn with_cause(mut self, err: &(dyn StdError + 'static)) -> Self {
        if (500..600).contains(&self.status) {
            self.stacktrace = Some(render_chain(err));
        }
        self
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        // Status and headers are fixed in the tuple; Axum serializes the body afterwards.
        let status = self.status_code();
        (
            status,
            [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
            Json(self),
        )
            .into_response()
    }
}

/// `"Unauthorized"` → `"UNAUTHORIZED"`, `"Not Found"` → `"NOT_FOUND"`.
fn status_name(reason: &str) -> String {
    reason
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// One line per error in the `source()` chain.
fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    lines.join("\n")
}

/// Generic handler error.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub exception: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, exception: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            exception,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFoundException", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.status, self.exception, self.message).into_response()
    }
}
