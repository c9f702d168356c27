// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication pipeline and its Axum middleware.
//!
//! Per request:
//!
//! 1. classify the path (public / secured / unmatched)
//! 2. secured only: extract the credential (bearer header, else cookie)
//! 3. validate it with Seki or the signed-token verifier
//! 4. normalize into an [`AuthenticatedPrincipal`]
//! 5. attach it to the request and run the handler inside the auth context
//!
//! Any failure in 2-4 short-circuits into an `AuthError` response; the
//! handler is never invoked. Nothing is cached or retried.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/api/things", get(list_things))
//!     .layer(axum::middleware::from_fn_with_state(authenticator, auth_middleware));
//! ```

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::runtime::Handle;
use tracing::Instrument;

use super::context::auth_span;
use super::credential::{extract_credential, CredentialSource};
use super::outcome::ValidationOutcome;
use super::policy::{PathClass, PathPolicy};
use super::verifier::JwtVerifier;
use super::{AuthError, AuthenticatedPrincipal};
use crate::seki::IdentityProvider;

/// How a credential is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStrategy {
    /// Always ask Seki.
    Seki,
    /// Always verify locally as a signed token.
    Jwt,
    /// Verify locally when the token is JWT-shaped and a key is configured
    /// for its issuer, otherwise ask Seki.
    #[default]
    Auto,
}

impl FromStr for TokenStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seki" => Ok(TokenStrategy::Seki),
            "jwt" => Ok(TokenStrategy::Jwt),
            "auto" => Ok(TokenStrategy::Auto),
            other => Err(format!(
                "unknown token strategy '{other}' (expected seki, jwt or auto)"
            )),
        }
    }
}

/// Authentication pipeline. Read-only after construction; cheap to clone.
#[derive(Clone)]
pub struct Authenticator {
    policy: Arc<PathPolicy>,
    provider: Arc<dyn IdentityProvider>,
    verifier: Option<Arc<JwtVerifier>>,
    strategy: TokenStrategy,
    csrf_enabled: bool,
}

impl Authenticator {
    pub fn new(policy: PathPolicy, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            policy: Arc::new(policy),
            provider,
            verifier: None,
            strategy: TokenStrategy::default(),
            csrf_enabled: false,
        }
    }

    pub fn with_verifier(mut self, verifier: JwtVerifier) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn with_strategy(mut self, strategy: TokenStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Refuse cookie credentials on unsafe methods.
    pub fn with_csrf(mut self, enabled: bool) -> Self {
        self.csrf_enabled = enabled;
        self
    }

    pub fn classify(&self, path: &str) -> PathClass {
        self.policy.classify(path)
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Validate a raw token with the configured strategy.
    pub async fn validate(&self, token: &str) -> ValidationOutcome {
        match (self.strategy, &self.verifier) {
            (TokenStrategy::Jwt, Some(verifier)) => verifier.verify(token).await,
            (TokenStrategy::Jwt, None) => {
                ValidationOutcome::ProviderError("no signed-token verifier is configured".into())
            }
            (TokenStrategy::Auto, Some(verifier))
                if looks_like_jwt(token) && verifier.has_key_for(token) =>
            {
                verifier.verify(token).await
            }
            _ => self.provider.validate(token).await.into(),
        }
    }

    /// Extract, validate and normalize the request credential.
    pub async fn authenticate(
        &self,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        let credential = extract_credential(headers).ok_or(AuthError::MissingCredential)?;

        if self.csrf_enabled
            && credential.source() == CredentialSource::SessionCookie
            && !is_safe_method(method)
        {
            return Err(AuthError::CsrfRejected(method.to_string()));
        }

        let outcome = self.validate(credential.token()).await;
        AuthenticatedPrincipal::normalize(outcome, credential.token())
    }

    /// Blocking form of [`authenticate`](Self::authenticate) for callers on
    /// a thread-per-request transport. Must not be called from async code;
    /// use it from `spawn_blocking` or a plain worker thread.
    pub fn authenticate_blocking(
        &self,
        handle: &Handle,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        handle.block_on(self.authenticate(method, headers))
    }
}

fn looks_like_jwt(token: &str) -> bool {
    token.split('.').count() == 3 && jsonwebtoken::decode_header(token).is_ok()
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(authenticator): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let path_class = authenticator.classify(request.uri().path());
    if path_class != PathClass::Secured {
        tracing::trace!(path = %request.uri().path(), ?path_class, "skipping authentication");
        return next.run(request).await;
    }

    match authenticator
        .authenticate(request.method(), request.headers())
        .await
    {
        Ok(principal) => {
            let span = auth_span(&principal);
            request.extensions_mut().insert(principal);
            next.run(request).instrument(span).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractor::{Auth, OptionalAuth};
    use crate::auth::principal::test_support::session;
    use crate::auth::verifier::test_support::{seki_claims, sign, SEKI_SECRET};
    use crate::auth::verifier::SEKI_ISSUER;
    use crate::seki::test_support::StubProvider;
    use crate::seki::SekiError;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::{get, post},
        Router,
    };
    use crate::auth::error::test_support::CapturedLevels;
    use reqwest::StatusCode as ProviderStatus;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;
    use tracing::{Level, Span};

    const SAMPLE_PATH: &str = "/api/test/sample-object";

    fn john_doe(token: &str) -> Result<crate::seki::SessionValidation, SekiError> {
        match token {
            "FOO" | "BAR" => Ok(session("tenantId456", "John", "Doe")),
            _ => Err(SekiError::InvalidToken),
        }
    }

    async fn sample(Auth(principal): Auth) -> String {
        principal.tenant_id().to_string()
    }

    async fn whoami(OptionalAuth(principal): OptionalAuth) -> String {
        principal.map_or_else(|| "anonymous".to_string(), |p| p.user_id().to_string())
    }

    fn current_span_name() -> String {
        Span::current()
            .metadata()
            .map_or("none", |m| m.name())
            .to_string()
    }

    async fn authenticated_context(Auth(_): Auth) -> String {
        current_span_name()
    }

    async fn public_context() -> String {
        current_span_name()
    }

    async fn failing(Auth(_): Auth) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn panicking(Auth(_): Auth) -> StatusCode {
        panic!("handler blew up")
    }

    fn app(authenticator: Authenticator) -> Router {
        Router::new()
            .route(SAMPLE_PATH, get(sample).post(sample))
            .route("/api/context", get(authenticated_context))
            .route("/api/failing", get(failing))
            .route("/api/panicking", get(panicking))
            .route("/actuator/health", get(whoami))
            .route("/static/page", get(whoami))
            .route("/static/context", get(public_context))
            .route("/static/upload", post(whoami))
            .layer(axum::middleware::from_fn_with_state(authenticator, auth_middleware))
            .layer(CatchPanicLayer::new())
    }

    fn authenticator(provider: Arc<StubProvider>) -> Authenticator {
        Authenticator::new(PathPolicy::default(), provider)
    }

    fn seki_verifier() -> JwtVerifier {
        JwtVerifier::new(vec![SEKI_ISSUER.to_string()]).with_seki_secret(SEKI_SECRET)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn get_request(path: &str, headers: &[(&str, &str)]) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(Method::GET).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn token_strategy_parses() {
        assert_eq!("SEKI".parse::<TokenStrategy>().unwrap(), TokenStrategy::Seki);
        assert_eq!(" jwt ".parse::<TokenStrategy>().unwrap(), TokenStrategy::Jwt);
        assert_eq!("auto".parse::<TokenStrategy>().unwrap(), TokenStrategy::Auto);
        assert!("ldap".parse::<TokenStrategy>().is_err());
    }

    #[tokio::test]
    async fn permitted_path_skips_validation_even_with_credentials() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider.clone()))
            .oneshot(get_request("/actuator/health", &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn unmatched_path_passes_through_unauthenticated() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider.clone()))
            .oneshot(get_request("/static/page", &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn secured_path_without_credential_is_401() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider.clone()))
            .oneshot(get_request(SAMPLE_PATH, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["exception"], "MissingCredentialException");
        assert_eq!(body["message"], "Authentication Error");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_401_and_logged_as_error() {
        let captured = CapturedLevels::start();
        let provider = Arc::new(StubProvider::new(|_| {
            Err(SekiError::UnexpectedStatus {
                status: ProviderStatus::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            })
        }));
        let response = app(authenticator(provider))
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["exception"], "ProviderUnavailableException");
        assert!(body.get("stacktrace").is_none());
        assert!(captured.contains(Level::ERROR));
    }

    #[tokio::test]
    async fn rejected_token_is_invalid_token() {
        let captured = CapturedLevels::start();
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider))
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", "Bearer NOPE")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["exception"], "InvalidTokenException");
        assert_eq!(body["detail"], "Invalid token: session token rejected by Seki");
        assert!(captured.quiet());
    }

    #[tokio::test]
    async fn missing_credential_is_not_logged_above_debug() {
        let captured = CapturedLevels::start();
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider))
            .oneshot(get_request(SAMPLE_PATH, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(captured.contains(Level::DEBUG));
        assert!(captured.quiet());
    }

    #[tokio::test]
    async fn valid_bearer_token_reaches_handler() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider.clone()))
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "tenantId456");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn valid_cookie_reaches_handler() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let response = app(authenticator(provider))
            .oneshot(get_request(
                SAMPLE_PATH,
                &[("cookie", "user_session_token_1234567=BAR"), ("x-state", "1234567")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "tenantId456");
    }

    #[tokio::test]
    async fn every_request_validates_again() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let app = app(authenticator(provider.clone()));
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(get_request(SAMPLE_PATH, &[("authorization", "Bearer FOO")]))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn csrf_refuses_cookie_on_unsafe_method() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let app = app(authenticator(provider.clone()).with_csrf(true));

        let cookie_post = HttpRequest::builder()
            .method(Method::POST)
            .uri(SAMPLE_PATH)
            .header("cookie", "user_session_token_1=BAR")
            .header("x-state", "1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(cookie_post).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["exception"], "CsrfRejectedException");
        assert_eq!(provider.calls(), 0);

        let bearer_post = HttpRequest::builder()
            .method(Method::POST)
            .uri(SAMPLE_PATH)
            .header("authorization", "Bearer FOO")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(bearer_post).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn auto_strategy_verifies_signed_tokens_locally() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let app = app(authenticator(provider.clone()).with_verifier(seki_verifier()));

        let token = sign(&seki_claims(), SEKI_SECRET, None);
        let response = app
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", &bearer(&token))]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "tenantId456");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn auto_strategy_without_key_for_issuer_asks_seki() {
        let token = sign(&seki_claims(), SEKI_SECRET, None);
        let expected = token.clone();
        let provider = Arc::new(StubProvider::new(move |presented| {
            if presented == expected {
                Ok(session("tenantId456", "John", "Doe"))
            } else {
                Err(SekiError::InvalidToken)
            }
        }));
        let keyless = JwtVerifier::new(vec![SEKI_ISSUER.to_string()]);
        let app = app(authenticator(provider.clone()).with_verifier(keyless));

        let response = app
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", &bearer(&token))]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "tenantId456");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn jwt_strategy_rejects_opaque_tokens() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let authenticator = authenticator(provider.clone())
            .with_verifier(seki_verifier())
            .with_strategy(TokenStrategy::Jwt);

        let response = app(authenticator)
            .oneshot(get_request(SAMPLE_PATH, &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["exception"], "InvalidTokenException");
        assert_eq!(provider.calls(), 0);
    }

    async fn span_seen_by_next_public_request(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(get_request("/static/context", &[]))
            .await
            .unwrap();
        body_string(response).await
    }

    #[tokio::test]
    async fn handler_runs_inside_auth_context_and_it_is_detached_afterwards() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let provider = Arc::new(StubProvider::new(john_doe));
        let app = app(authenticator(provider));

        let response = app
            .clone()
            .oneshot(get_request("/api/context", &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "auth_context");
        assert_eq!(span_seen_by_next_public_request(&app).await, "none");

        let response = app
            .clone()
            .oneshot(get_request("/api/failing", &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(span_seen_by_next_public_request(&app).await, "none");
    }

    #[tokio::test]
    async fn auth_context_is_detached_after_handler_panic() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let provider = Arc::new(StubProvider::new(john_doe));
        let app = app(authenticator(provider));

        let response = app
            .clone()
            .oneshot(get_request("/api/panicking", &[("authorization", "Bearer FOO")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(span_seen_by_next_public_request(&app).await, "none");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_variant_matches_async_pipeline() {
        let provider = Arc::new(StubProvider::new(john_doe));
        let authenticator = authenticator(provider);
        let handle = Handle::current();

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer FOO".parse().unwrap());

        let principal = tokio::task::spawn_blocking(move || {
            authenticator.authenticate_blocking(&handle, &Method::GET, &headers)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(principal.tenant_id(), "tenantId456");
        assert_eq!(principal.user_full_name(), "John Doe");
    }
}
