// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request tenant binding.
//!
//! [`resolve_tenant`] builds a fresh [`RequestIdentity`] for every request
//! and stores it in that request's extensions. Nothing request-scoped lives
//! anywhere else, so concurrent requests never observe each other's tenant
//! or user.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::domain::DomainResolver;
use super::error::TenantResolutionError;
use super::resolver::ResolveOptions;
use crate::auth::UserContext;
use crate::error::ApiError;
use crate::models::Tenant;
use crate::state::AppState;

/// Identity of one in-flight request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestIdentity {
    pub tenant: Option<Tenant>,
    pub user: Option<UserContext>,
}

impl RequestIdentity {
    pub fn for_tenant(tenant: Tenant) -> Self {
        Self {
            tenant: Some(tenant),
            user: None,
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant.as_ref().map(|t| t.id)
    }

    /// Attach the authenticated user.
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }
}

/// Resolve the tenant of the request from its host.
///
/// Skip-listed paths get an empty identity. On paths that require a tenant,
/// a failed resolution ends the request with the resolution error's status;
/// elsewhere the request continues without a tenant.
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let host = DomainResolver::host_header(request.headers());

    let result = state
        .tenants
        .resolve_request(&path, host.as_deref(), ResolveOptions::default())
        .await;

    let identity = match result.into_result() {
        Ok(tenant) => RequestIdentity {
            tenant,
            user: None,
        },
        Err(error) if state.tenants.is_required(&path) => {
            tracing::debug!(path = %path, code = ?error.code, "Tenant required but not resolved");
            return ApiError::from(error).into_response();
        }
        Err(error) => {
            tracing::debug!(path = %path, code = ?error.code, "Continuing without tenant");
            RequestIdentity::default()
        }
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// The request's identity, empty if resolution did not run.
#[derive(Debug, Clone)]
pub struct Identity(pub RequestIdentity);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity(
            parts
                .extensions
                .get::<RequestIdentity>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// The resolved tenant; rejects with `tenant_not_found` when there is none.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Tenant);

impl<S: Send + Sync> FromRequestParts<S> for CurrentTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(|identity| identity.tenant.clone())
            .map(CurrentTenant)
            .ok_or_else(|| ApiError::from(TenantResolutionError::not_found()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::TestApp;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Json, Router};
    use tower::ServiceExt;

    async fn whoami(Identity(identity): Identity) -> Json<Option<Uuid>> {
        // Yield so concurrent requests interleave inside the handler.
        tokio::task::yield_now().await;
        Json(identity.tenant_id())
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/whoami", get(whoami))
            .route("/public/whoami", get(whoami))
            .route("/health", get(whoami))
            .layer(from_fn_with_state(state.clone(), resolve_tenant))
            .with_state(state)
    }

    async fn tenant_of(app: &Router, path: &str, host: &str) -> (StatusCode, Option<Uuid>) {
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(path)
                    .header("host", host)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).ok().flatten())
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_tenant() {
        let t = TestApp::new();
        let a = t.store.insert_tenant(Tenant::new("Tenant A", "a.example"));
        let b = t.store.insert_tenant(Tenant::new("Tenant B", "b.example"));
        let app = app(t.state.clone());

        let mut handles = Vec::new();
        for i in 0..64 {
            let app = app.clone();
            let (host, expected) = if i % 2 == 0 {
                ("a.example", a.id)
            } else {
                ("b.example", b.id)
            };
            handles.push(tokio::spawn(async move {
                let (status, seen) = tenant_of(&app, "/api/whoami", host).await;
                assert_eq!(status, StatusCode::OK);
                assert_eq!(seen, Some(expected));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn required_path_fails_closed() {
        let app = app(TestApp::new().state);
        let (status, _) = tenant_of(&app, "/api/whoami", "unknown.example").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn optional_path_continues_without_tenant() {
        let app = app(TestApp::new().state);
        let (status, seen) = tenant_of(&app, "/public/whoami", "unknown.example").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(seen, None);
    }

    #[tokio::test]
    async fn skipped_path_never_resolves() {
        let t = TestApp::new();
        t.store.insert_tenant(Tenant::new("Tenant A", "a.example"));
        let app = app(t.state.clone());
        let (status, seen) = tenant_of(&app, "/health", "a.example").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(seen, None);
    }
}
