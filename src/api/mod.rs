// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    http::{header::CACHE_CONTROL, HeaderValue},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_auth, Action, AuthGate, Permission, Resource, Role, UserContext},
    error::{error_envelope, not_found, ErrorBody, ErrorDetail},
    models::{AuthResponse, LoginRequest, RefreshResponse, RegisterRequest},
    state::AppState,
    tenant::resolve_tenant,
};

pub mod auth;
pub mod features;
pub mod health;
pub mod tenant;

/// Prefix whose responses must never be cached.
const AUTH_PREFIX: &str = "/api/auth";
const NO_STORE: &str = "no-store, no-cache, must-revalidate";

pub fn router(state: AppState) -> Router {
    let authenticated = AuthGate::new(state.auth.clone());
    let settings_reader = authenticated
        .clone()
        .require(Permission::new(Action::Read, Resource::Settings));
    let features_reader = authenticated
        .clone()
        .require(Permission::new(Action::Read, Resource::Features));
    let features_writer = authenticated
        .clone()
        .require(Permission::new(Action::Update, Resource::Features));

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/refresh", post(auth::refresh))
        .route(
            "/me",
            get(auth::me).route_layer(from_fn_with_state(authenticated, require_auth)),
        );

    let api_routes = Router::new()
        .nest(AUTH_PREFIX, auth_routes)
        .route(
            "/api/tenant",
            get(tenant::get_tenant).route_layer(from_fn_with_state(settings_reader, require_auth)),
        )
        .route(
            "/api/features",
            get(features::get_features)
                .route_layer(from_fn_with_state(features_reader, require_auth))
                .merge(
                    put(features::update_features)
                        .route_layer(from_fn_with_state(features_writer, require_auth)),
                ),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .fallback(not_found)
        .with_state(state.clone());

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state, resolve_tenant))
        .layer(from_fn(no_store_auth_responses))
        .layer(from_fn(error_envelope))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Mark every `/api/auth` response, errors included, as uncacheable.
async fn no_store_auth_responses(request: Request, next: Next) -> Response {
    let is_auth = request.uri().path().starts_with(AUTH_PREFIX);
    let mut response = next.run(request).await;
    if is_auth {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    }
    response
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::refresh,
        auth::me,
        tenant::get_tenant,
        features::get_features,
        features::update_features,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            AuthResponse,
            RefreshResponse,
            UserContext,
            Role,
            ErrorBody,
            ErrorDetail,
            auth::MeResponse,
            tenant::TenantResponse,
            tenant::TenantSummary,
            features::FeaturesResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Tenant-scoped login, registration and token refresh"),
        (name = "Tenant", description = "The tenant resolved for the request"),
        (name = "Features", description = "Per-tenant feature flags"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::models::Tenant;
    use crate::state::test_support::{TestApp, TEST_PASSWORD};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use base64::Engine;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const HOST: &str = "acme.example";

    struct Reply {
        status: StatusCode,
        headers: axum::http::HeaderMap,
        body: Value,
    }

    async fn send(app: &Router, method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = HttpRequest::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, HOST);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    fn setup() -> (TestApp, Tenant, Router) {
        let t = TestApp::new();
        let tenant = t.store.insert_tenant(Tenant::new("Acme", HOST));
        let app = router(t.state.clone());
        (t, tenant, app)
    }

    fn token_payload(token: &str) -> Value {
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn registration(email: &str) -> Value {
        json!({
            "email": email,
            "password": "Sufficiently-Long-1",
            "firstName": "Ada",
            "lastName": "Lovelace"
        })
    }

    #[tokio::test]
    async fn login_issues_token_for_resolved_tenant() {
        let (t, tenant, app) = setup();
        t.user(&tenant, "owner@acme.example", Role::Owner).await;

        let reply = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "Owner@Acme.example", "password": TEST_PASSWORD })),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        let token = reply.body["token"].as_str().unwrap();
        assert_eq!(token_payload(token)["tenantId"], json!(tenant.id));
        assert_eq!(reply.body["user"]["role"], "owner");
        assert!(reply.body["expiresAt"].is_string());
        assert_eq!(reply.headers[CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_in_comparable_time() {
        let (t, tenant, app) = setup();
        t.user(&tenant, "staff@acme.example", Role::Staff).await;

        let attempt = |password: &'static str| {
            let app = app.clone();
            async move {
                let started = Instant::now();
                let reply = send(
                    &app,
                    "POST",
                    "/api/auth/login",
                    None,
                    Some(json!({ "email": "staff@acme.example", "password": password })),
                )
                .await;
                (reply, started.elapsed())
            }
        };

        let mut correct = Duration::ZERO;
        let mut wrong = Duration::ZERO;
        for _ in 0..5 {
            let (ok, elapsed) = attempt(TEST_PASSWORD).await;
            assert_eq!(ok.status, StatusCode::OK);
            correct += elapsed;

            let (denied, elapsed) = attempt("not-the-password").await;
            assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
            assert_eq!(denied.body["error"]["code"], "invalid_credentials");
            assert_eq!(denied.body["path"], "/api/auth/login");
            assert_eq!(denied.headers[header::WWW_AUTHENTICATE], "Bearer realm=\"api\"");
            wrong += elapsed;
        }
        assert!(wrong * 4 >= correct, "wrong={wrong:?} correct={correct:?}");
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (_t, _tenant, app) = setup();

        let first = send(&app, "POST", "/api/auth/register", None, Some(registration("dup@x.com"))).await;
        assert_eq!(first.status, StatusCode::CREATED);
        assert_eq!(first.body["user"]["role"], "customer");

        let second = send(&app, "POST", "/api/auth/register", None, Some(registration("dup@x.com"))).await;
        assert_eq!(second.status, StatusCode::BAD_REQUEST);
        assert_eq!(second.body["error"]["code"], "email_already_exists");
    }

    #[tokio::test]
    async fn customer_cannot_read_tenant_settings() {
        let (t, tenant, app) = setup();
        let (_, customer) = t.user(&tenant, "c@acme.example", Role::Customer).await;
        let (_, staff) = t.user(&tenant, "s@acme.example", Role::Staff).await;

        let denied = send(&app, "GET", "/api/tenant", Some(&customer), None).await;
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.body["error"]["code"], "insufficient_permissions");

        let allowed = send(&app, "GET", "/api/tenant", Some(&staff), None).await;
        assert_eq!(allowed.status, StatusCode::OK);
        assert_eq!(allowed.body["data"]["id"], json!(tenant.id));
        assert_eq!(allowed.body["data"]["domain"], HOST);
    }

    #[tokio::test]
    async fn refresh_honours_grace_window() {
        let (t, tenant, app) = setup();
        let (_, token) = t.user(&tenant, "o@acme.example", Role::Owner).await;
        let ttl = chrono::Duration::from_std(t.state.config.token.ttl).unwrap();

        t.clock.advance(ttl + chrono::Duration::minutes(3));
        let ok = send(&app, "POST", "/api/auth/refresh", Some(&token), None).await;
        assert_eq!(ok.status, StatusCode::OK);
        let fresh = ok.body["token"].as_str().unwrap();
        assert_ne!(fresh, token);
        assert_eq!(token_payload(fresh)["tenantId"], json!(tenant.id));

        t.clock.advance(chrono::Duration::minutes(7));
        let late = send(&app, "POST", "/api/auth/refresh", Some(&token), None).await;
        assert_eq!(late.status, StatusCode::UNAUTHORIZED);
        assert_eq!(late.body["error"]["code"], "token_invalid");
    }

    #[tokio::test]
    async fn refresh_requires_bearer_token() {
        let (_t, _tenant, app) = setup();
        let reply = send(&app, "POST", "/api/auth/refresh", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body["error"]["code"], "missing_token");
    }

    #[tokio::test]
    async fn owner_updates_one_feature() {
        let (t, tenant, app) = setup();
        let (_, owner) = t.user(&tenant, "o@acme.example", Role::Owner).await;

        send(&app, "PUT", "/api/features", Some(&owner), Some(json!({ "orders": true }))).await;
        let put = send(&app, "PUT", "/api/features", Some(&owner), Some(json!({ "orders": false }))).await;
        assert_eq!(put.status, StatusCode::OK);

        let get = send(&app, "GET", "/api/features", Some(&owner), None).await;
        assert_eq!(get.status, StatusCode::OK);
        assert_eq!(get.body["success"], true);
        assert_eq!(
            get.body["data"],
            json!({ "menu": true, "orders": false, "loyalty": false })
        );
    }

    #[tokio::test]
    async fn feature_update_rejects_bad_bodies() {
        let (t, tenant, app) = setup();
        let (_, owner) = t.user(&tenant, "o@acme.example", Role::Owner).await;

        let unknown = send(&app, "PUT", "/api/features", Some(&owner), Some(json!({ "valet": true }))).await;
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
        assert_eq!(unknown.body["error"]["details"]["unknownFlags"], json!(["valet"]));

        let not_bool = send(&app, "PUT", "/api/features", Some(&owner), Some(json!({ "orders": "yes" }))).await;
        assert_eq!(not_bool.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn staff_cannot_manage_features() {
        let (t, tenant, app) = setup();
        let (_, staff) = t.user(&tenant, "s@acme.example", Role::Staff).await;
        let reply = send(&app, "GET", "/api/features", Some(&staff), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn token_from_other_tenant_is_rejected() {
        let (t, _tenant, app) = setup();
        let other = t.store.insert_tenant(Tenant::new("Other", "other.example"));
        let (_, token) = t.user(&other, "o@other.example", Role::Owner).await;

        let reply = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.body["error"]["code"], "tenant_mismatch");
    }

    #[tokio::test]
    async fn me_returns_current_user() {
        let (t, tenant, app) = setup();
        let (user, token) = t.user(&tenant, "c@acme.example", Role::Customer).await;

        let reply = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["user"]["id"], json!(user.id));
        assert_eq!(reply.headers[CACHE_CONTROL], NO_STORE);
    }

    #[tokio::test]
    async fn unknown_host_is_not_found_on_api() {
        let (_t, _tenant, app) = setup();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::HOST, "nobody.example")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "email": "a@b.c", "password": "x" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CACHE_CONTROL], NO_STORE);
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["error"]["code"], "tenant_not_found");
        assert_eq!(body["path"], "/api/auth/login");
    }

    #[tokio::test]
    async fn health_skips_tenant_resolution() {
        let (_t, _tenant, app) = setup();
        let request = HttpRequest::builder()
            .uri("/health/live")
            .header(header::HOST, "nobody.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn unknown_route_uses_error_envelope() {
        let (_t, _tenant, app) = setup();
        let reply = send(&app, "GET", "/api/nope", None, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.body["error"]["code"], "not_found");
        assert_eq!(reply.body["path"], "/api/nope");
    }

    #[test]
    fn openapi_lists_auth_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/features"));
    }
}
