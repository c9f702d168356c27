// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::Uri, middleware, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{auth_middleware, guard_middleware, require_authority, require_same_tenant},
    cors::{cors_layer, origin_gate},
    error::{ApiError, ErrorResponse},
    seki::{HealthStatus, ProviderHealth},
    state::AppState,
};

pub mod health;
pub mod users;

/// Authority required to read tenant-scoped resources.
pub const TENANT_READ: &str = "tenant:read";

pub fn router(state: AppState) -> Router {
    let tenant_routes: Router<AppState> = Router::new()
        .route("/api/tenants/{tenantId}/me", get(users::get_tenant_user))
        .route_layer(middleware::from_fn_with_state(
            require_same_tenant(),
            guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            require_authority(TENANT_READ),
            guard_middleware,
        ));

    Router::new()
        .route("/actuator/health", get(health::health))
        .route("/api/me", get(users::get_current_user))
        .merge(tenant_routes)
        .fallback(not_found)
        .with_state(state.clone())
        .merge(
            SwaggerUi::new("/swagger-ui").url("/v3/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            auth_middleware,
        ))
        .layer(cors_layer(&state.cors))
        .layer(middleware::from_fn_with_state(state.cors.clone(), origin_gate))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Seki session token or signed token. Browsers may send the \
                             user_session_token_<state> cookie with X-STATE instead.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health, users::get_current_user, users::get_tenant_user),
    components(schemas(
        health::HealthResponse,
        users::UserMeResponse,
        ProviderHealth,
        HealthStatus,
        ErrorResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Gateway and identity provider health"),
        (name = "Users", description = "Authenticated principal")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::principal::test_support::session;
    use crate::auth::{Authenticator, PathPolicy};
    use crate::cors::CorsConfig;
    use crate::seki::test_support::StubProvider;
    use crate::seki::{SekiError, SessionValidation};

    fn tenant_reader(token: &str) -> Result<SessionValidation, SekiError> {
        let mut validation = session("tenantId456", "John", "Doe");
        match token {
            "READER" => {
                validation
                    .user_session
                    .metadata
                    .insert("authorities".to_string(), serde_json::json!([TENANT_READ]));
                Ok(validation)
            }
            "FOO" => Ok(validation),
            _ => Err(SekiError::InvalidToken),
        }
    }

    fn state(provider: StubProvider) -> AppState {
        AppState::new(Authenticator::new(PathPolicy::default(), Arc::new(provider)))
    }

    fn app() -> Router {
        router(state(StubProvider::new(tenant_reader)))
    }

    async fn send(app: Router, method: Method, uri: &str, headers: &[(&str, &str)]) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn get(app: Router, uri: &str, headers: &[(&str, &str)]) -> Response {
        send(app, Method::GET, uri, headers).await
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_seki_status() {
        let response = get(app(), "/actuator/health", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "UP");
        assert_eq!(body["seki"]["status"], "UP");

        let down = router(state(StubProvider::new(tenant_reader).unhealthy()));
        let response = get(down, "/actuator/health", &[]).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json(response).await;
        assert_eq!(body["status"], "DOWN");
        assert!(body["seki"]["error"].is_string());
    }

    #[tokio::test]
    async fn me_requires_credentials() {
        let response = get(app(), "/api/me", &[]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["exception"], "MissingCredentialException");
    }

    #[tokio::test]
    async fn me_returns_principal() {
        let response = get(app(), "/api/me", &[("authorization", "Bearer FOO")]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["tenantId"], "tenantId456");
        assert_eq!(body["userFullName"], "John Doe");
    }

    #[tokio::test]
    async fn tenant_route_is_guarded() {
        let own = get(
            app(),
            "/api/tenants/tenantId456/me",
            &[("authorization", "Bearer READER")],
        )
        .await;
        assert_eq!(own.status(), StatusCode::OK);

        let other = get(
            app(),
            "/api/tenants/someoneElse/me",
            &[("authorization", "Bearer READER")],
        )
        .await;
        assert_eq!(other.status(), StatusCode::FORBIDDEN);
        let body = json(other).await;
        assert_eq!(body["exception"], "ForbiddenException");
        assert_eq!(body["message"], "Authorization Error");

        let no_authority = get(
            app(),
            "/api/tenants/tenantId456/me",
            &[("authorization", "Bearer FOO")],
        )
        .await;
        assert_eq!(no_authority.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_routes() {
        let response = get(app(), "/nope", &[]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["exception"], "NotFoundException");

        // Secured prefix: authentication happens before routing gives up.
        let response = get(app(), "/api/nope", &[]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn openapi_document_is_public() {
        let response = get(app(), "/v3/api-docs/openapi.json", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert!(body["paths"]["/api/me"].is_object());
        assert!(body["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = get(app(), "/actuator/health", &[]).await;
        assert!(response.headers().contains_key("x-request-id"));

        let response = get(app(), "/actuator/health", &[("x-request-id", "req-42")]).await;
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn restricted_cors_in_front_of_authentication() {
        let cors = CorsConfig::default()
            .with_allowed_origins(vec!["https://app.example.com".to_string()]);
        let app = router(state(StubProvider::new(tenant_reader)).with_cors(cors));

        let rejected = get(
            app.clone(),
            "/actuator/health",
            &[("origin", "https://evil.example.com")],
        )
        .await;
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

        let preflight = send(
            app.clone(),
            Method::OPTIONS,
            "/api/me",
            &[
                ("origin", "https://app.example.com"),
                ("access-control-request-method", "GET"),
            ],
        )
        .await;
        assert_eq!(preflight.status(), StatusCode::OK);

        let no_origin = get(app, "/api/me", &[("authorization", "Bearer FOO")]).await;
        assert_eq!(no_origin.status(), StatusCode::OK);
    }
}
