// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ronin Auth Gateway - token / session authentication in front of Ronin services
//!
//! Secured requests carry a Seki session token (bearer header or session
//! cookie) or a signed token; the gateway validates it, normalizes the
//! result into an authenticated principal and enforces the path policy.
//!
//! ## Modules
//!
//! - `api` - HTTP routes, OpenAPI document (Axum)
//! - `auth` - Authentication pipeline, path policy, guards
//! - `seki` - Seki identity provider client
//! - `cors` - CORS layer and origin gate
//! - `config` - Environment configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod seki;
pub mod state;
pub mod telemetry;
