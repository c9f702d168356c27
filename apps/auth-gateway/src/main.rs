// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use ronin_auth_gateway::{api::router, config::GatewayConfig, state::AppState, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet; the format itself may be what failed to parse.
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(config.log_format);
    config.warn_ineffective();

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize gateway");
            return ExitCode::FAILURE;
        }
    };
    let app = router(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        %addr,
        seki = %config.seki_url,
        strategy = ?config.token_strategy,
        "Ronin auth gateway listening (docs at /swagger-ui)"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
