// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied per router subtree with `from_fn_with_state`:
//!
//! ```rust,ignore
//! let gate = AuthGate::new(state.auth.clone())
//!     .require(Permission::new(Action::Update, Resource::Features));
//!
//! Router::new()
//!     .route("/api/features", put(update_features))
//!     .route_layer(axum::middleware::from_fn_with_state(gate, require_auth));
//! ```
//!
//! Both middlewares expect [`crate::tenant::resolve_tenant`] to have run
//! first and extend its [`RequestIdentity`] with the user.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthService, Permission, UserContext};
use crate::audit::{RequestMeta, SecurityEvent, SecurityEventType};
use crate::tenant::RequestIdentity;

/// Authentication requirements for a router subtree.
#[derive(Clone)]
pub struct AuthGate {
    auth: Arc<AuthService>,
    required: Option<Permission>,
}

impl AuthGate {
    /// Any authenticated user of the request's tenant.
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            required: None,
        }
    }

    /// Additionally require a permission.
    pub fn require(mut self, permission: Permission) -> Self {
        self.required = Some(permission);
        self
    }

    /// Run the full pipeline: token, user, tenant match, permission.
    pub async fn check(
        &self,
        headers: &HeaderMap,
        identity: &RequestIdentity,
    ) -> Result<UserContext, AuthError> {
        let token = bearer_token(headers)?;
        let user = self.auth.authenticate(token, identity.tenant_id()).await?;

        if let Some(permission) = self.required {
            if !user.role.allows(permission) {
                return Err(AuthError::InsufficientPermissions(permission));
            }
        }
        Ok(user)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Reject the request unless it carries a valid token for the resolved
/// tenant with the gate's permission.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<RequestIdentity>()
        .cloned()
        .unwrap_or_default();

    match gate.check(request.headers(), &identity).await {
        Ok(user) => {
            request.extensions_mut().insert(identity.with_user(user));
            next.run(request).await
        }
        Err(error) => {
            let meta = RequestMeta::new(request.method(), request.uri().path(), request.headers());
            denial_event(&gate, &error, &identity, request.headers(), meta).emit();
            error.into_response()
        }
    }
}

/// Attach the user when a valid token is present; never rejects.
pub async fn optional_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<RequestIdentity>()
        .cloned()
        .unwrap_or_default();

    match gate.check(request.headers(), &identity).await {
        Ok(user) => {
            request.extensions_mut().insert(identity.with_user(user));
        }
        Err(AuthError::TenantMismatch) => {
            tracing::warn!(
                tenant_id = ?identity.tenant_id(),
                path = %request.uri().path(),
                "Ignoring token issued for another tenant"
            );
        }
        Err(_) => {}
    }
    next.run(request).await
}

/// Security event for a rejected request. Tenant mismatches also record the
/// token's tenant and user, read from the signature-checked claims.
fn denial_event(
    gate: &AuthGate,
    error: &AuthError,
    identity: &RequestIdentity,
    headers: &HeaderMap,
    meta: RequestMeta,
) -> SecurityEvent {
    let event_type = match error {
        AuthError::TenantMismatch => SecurityEventType::TenantMismatch,
        AuthError::InsufficientPermissions(_) => SecurityEventType::PermissionDenied,
        _ => SecurityEventType::AuthenticationFailed,
    };
    let mut event = SecurityEvent::new(event_type)
        .with_request(meta)
        .failed(error.error_code());
    if let Some(tenant_id) = identity.tenant_id() {
        event = event.with_tenant(tenant_id);
    }
    if matches!(error, AuthError::TenantMismatch) {
        let claims = bearer_token(headers)
            .ok()
            .and_then(|token| gate.auth.tokens().verify_signature(token).ok());
        if let Some(claims) = claims {
            event = event
                .with_user(claims.user_id)
                .with_token_tenant(claims.tenant_id);
        }
    }
    event
}
