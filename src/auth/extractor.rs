// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated user.
//!
//! ```rust,ignore
//! async fn me(Auth(user): Auth) -> impl IntoResponse {
//!     Json(user)
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthGate, UserContext};
use crate::state::AppState;
use crate::tenant::RequestIdentity;

/// Extractor for authenticated users.
///
/// Uses the user attached by [`super::require_auth`] when present, otherwise
/// runs the same checks (token, user lookup, tenant match) itself.
pub struct Auth(pub UserContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .unwrap_or_default();

        if let Some(user) = identity.user.clone() {
            return Ok(Auth(user));
        }

        let user = AuthGate::new(state.auth.clone())
            .check(&parts.headers, &identity)
            .await?;
        parts.extensions.insert(identity.with_user(user.clone()));
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// `None` when no valid token for this tenant is present.
pub struct OptionalAuth(pub Option<UserContext>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}
