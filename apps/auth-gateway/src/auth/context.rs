// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped logging context for authenticated requests.
//!
//! The downstream handler future is instrumented with an `auth_context`
//! span, so the fields below appear on every event it emits. The span is
//! only entered while that future is polled, which means it is detached on
//! every exit path: normal return, error response, panic, or cancellation.

use tracing::{field, Span};

use super::AuthenticatedPrincipal;

/// Span name carrying the authenticated fields.
pub const AUTH_CONTEXT_SPAN: &str = "auth_context";

/// Build the span projecting `principal` into the logging context.
pub fn auth_span(principal: &AuthenticatedPrincipal) -> Span {
    let span = tracing::info_span!(
        "auth_context",
        authenticated = principal.is_authenticated(),
        user_id = %principal.user_id(),
        tenant_id = %principal.tenant_id(),
        user_type = field::Empty,
        patient_id = field::Empty,
        provider_id = field::Empty,
    );
    if let Some(user_type) = principal.user_type() {
        span.record("user_type", user_type);
    }
    span
}

/// Record the patient a handler is accessing on the current auth context.
pub fn record_accessed_patient(patient_id: &str) {
    Span::current().record("patient_id", patient_id);
}

/// Record the provider a handler is accessing on the current auth context.
pub fn record_accessed_provider(provider_id: &str) {
    Span::current().record("provider_id", provider_id);
}
