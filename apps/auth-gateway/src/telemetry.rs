// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, DEFAULT_LOG_FILTER};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// JSON output lists the enclosing spans, so the `auth_context` fields
/// appear on every event emitted while a secured request is handled.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder
            .json()
            .with_span_list(true)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => builder.with_span_events(FmtSpan::NONE).init(),
    }
}
