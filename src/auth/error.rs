// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::password::PasswordStrength;
use super::roles::Permission;
use super::token::TokenError;
use crate::error::ApiError;

/// Tagged reason an authentication or authorization step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MalformedToken,
    MissingToken,
    InsufficientPermissions,
    TenantMismatch,
    UserNotFound,
    EmailAlreadyExists,
    WeakPassword,
    ValidationError,
    TokenNotRefreshable,
    RateLimited,
    InternalError,
}

impl AuthErrorCode {
    /// Code as it appears in error response bodies.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::TokenExpired => "token_expired",
            Self::TokenInvalid => "token_invalid",
            Self::MalformedToken => "malformed_token",
            Self::MissingToken => "missing_token",
            Self::InsufficientPermissions => "insufficient_permissions",
            Self::TenantMismatch => "tenant_mismatch",
            Self::UserNotFound => "user_not_found",
            Self::EmailAlreadyExists => "email_already_exists",
            Self::WeakPassword => "weak_password",
            Self::ValidationError => "validation_error",
            Self::TokenNotRefreshable => "token_not_refreshable",
            Self::RateLimited => "rate_limited",
            Self::InternalError => "internal_error",
        }
    }

    /// 401 for who you are, 403 for what you may do.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::MalformedToken
            | Self::MissingToken
            | Self::UserNotFound
            | Self::TokenNotRefreshable => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions | Self::TenantMismatch => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::WeakPassword | Self::ValidationError => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Authentication error type.
///
/// Messages never say whether an email or user exists and never echo
/// submitted secrets.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MalformedToken,
    MissingToken,
    InsufficientPermissions(Permission),
    TenantMismatch,
    UserNotFound,
    EmailAlreadyExists,
    WeakPassword(PasswordStrength),
    Validation(Vec<FieldError>),
    TokenNotRefreshable,
    RateLimited,
    /// Store or worker failure; the cause is logged where it is converted.
    Internal,
}

impl AuthError {
    pub fn code(&self) -> AuthErrorCode {
        match self {
            AuthError::InvalidCredentials => AuthErrorCode::InvalidCredentials,
            AuthError::TokenExpired => AuthErrorCode::TokenExpired,
            AuthError::TokenInvalid => AuthErrorCode::TokenInvalid,
            AuthError::MalformedToken => AuthErrorCode::MalformedToken,
            AuthError::MissingToken => AuthErrorCode::MissingToken,
            AuthError::InsufficientPermissions(_) => AuthErrorCode::InsufficientPermissions,
            AuthError::TenantMismatch => AuthErrorCode::TenantMismatch,
            AuthError::UserNotFound => AuthErrorCode::UserNotFound,
            AuthError::EmailAlreadyExists => AuthErrorCode::EmailAlreadyExists,
            AuthError::WeakPassword(_) => AuthErrorCode::WeakPassword,
            AuthError::Validation(_) => AuthErrorCode::ValidationError,
            AuthError::TokenNotRefreshable => AuthErrorCode::TokenNotRefreshable,
            AuthError::RateLimited => AuthErrorCode::RateLimited,
            AuthError::Internal => AuthErrorCode::InternalError,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        self.code().wire_code()
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AuthError::InsufficientPermissions(permission) => {
                Some(json!({ "required": permission.to_string() }))
            }
            AuthError::WeakPassword(strength) => Some(json!({ "strength": strength })),
            AuthError::Validation(fields) => Some(json!({ "fields": fields })),
            _ => None,
        }
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation(vec![FieldError::new(field, message)])
    }

    /// Whether this failure is about the caller's identity (401).
    pub fn is_unauthenticated(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Token is invalid"),
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::MissingToken => {
                write!(f, "Authorization header is required (expected 'Bearer <token>')")
            }
            AuthError::InsufficientPermissions(_) => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::TenantMismatch => write!(f, "Token does not belong to this tenant"),
            AuthError::UserNotFound => write!(f, "Authentication failed"),
            AuthError::EmailAlreadyExists => {
                write!(f, "An account with this email already exists")
            }
            AuthError::WeakPassword(_) => {
                write!(f, "Password must be at least 8 characters long")
            }
            AuthError::Validation(_) => write!(f, "Request validation failed"),
            AuthError::TokenNotRefreshable => write!(f, "Token can no longer be refreshed"),
            AuthError::RateLimited => write!(f, "Too many attempts, try again later"),
            AuthError::Internal => write!(f, "Authentication is temporarily unavailable"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::BadSignature | TokenError::NotYetValid | TokenError::InvalidClaims => {
                AuthError::TokenInvalid
            }
            TokenError::WeakSecret | TokenError::Encoding(_) => {
                tracing::error!(error = %error, "Token codec failure");
                AuthError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let mut api = ApiError::new(error.status_code(), error.error_code(), error.to_string());
        api.details = error.details();
        api
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Action, Resource};
    use axum::body::to_bytes;
    use axum::http::header::WWW_AUTHENTICATE;

    #[tokio::test]
    async fn missing_token_returns_401() {
        let response = AuthError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"api\""
        );

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"]["code"], "missing_token");
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let error =
            AuthError::InsufficientPermissions(Permission::new(Action::Update, Resource::Features));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"]["details"]["required"], "update:features");
    }

    #[test]
    fn statuses_follow_identity_vs_permission() {
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TenantMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::EmailAlreadyExists.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn token_failures_map_to_codes() {
        assert_eq!(AuthError::from(TokenError::Malformed), AuthError::MalformedToken);
        assert_eq!(AuthError::from(TokenError::BadSignature), AuthError::TokenInvalid);
        assert_eq!(AuthError::from(TokenError::Expired), AuthError::TokenExpired);
        assert_eq!(AuthError::from(TokenError::NotYetValid), AuthError::TokenInvalid);
    }

    #[test]
    fn validation_details_list_fields() {
        let error = AuthError::invalid_field("email", "Email is invalid");
        let details = error.details().unwrap();
        assert_eq!(details["fields"][0]["field"], "email");
    }
}
