// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tenant resolution errors.

use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::{CacheError, StoreError};

/// Tagged reason a tenant could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantResolutionErrorCode {
    TenantNotFound,
    InvalidDomain,
    DatabaseError,
    CacheError,
    DomainParseError,
    TenantDisabled,
}

impl TenantResolutionErrorCode {
    /// Code as it appears in error response bodies.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::TenantNotFound => "tenant_not_found",
            Self::InvalidDomain => "invalid_domain",
            Self::DatabaseError => "database_error",
            Self::CacheError => "cache_error",
            Self::DomainParseError => "domain_parse_error",
            Self::TenantDisabled => "tenant_disabled",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TenantNotFound => StatusCode::NOT_FOUND,
            Self::InvalidDomain | Self::DomainParseError => StatusCode::BAD_REQUEST,
            Self::TenantDisabled => StatusCode::FORBIDDEN,
            Self::DatabaseError | Self::CacheError => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Tenant resolution failure, safe to serialize to clients.
///
/// Driver and transport errors are logged where they are converted and never
/// copied into `message`.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct TenantResolutionError {
    pub code: TenantResolutionErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TenantResolutionError {
    pub fn new(code: TenantResolutionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new(TenantResolutionErrorCode::TenantNotFound, "Tenant not found")
    }

    pub fn disabled() -> Self {
        Self::new(
            TenantResolutionErrorCode::TenantDisabled,
            "Tenant is disabled",
        )
    }

    pub fn invalid_domain() -> Self {
        Self::new(
            TenantResolutionErrorCode::InvalidDomain,
            "Request does not carry a host",
        )
    }

    pub fn parse_error(hostname: &str) -> Self {
        Self {
            details: Some(serde_json::json!({ "hostname": hostname })),
            ..Self::new(
                TenantResolutionErrorCode::DomainParseError,
                "Host is not a valid domain name",
            )
        }
    }

    pub fn database(error: &StoreError) -> Self {
        tracing::error!(error = %error, "Tenant store lookup failed");
        Self::new(
            TenantResolutionErrorCode::DatabaseError,
            "Tenant lookup is temporarily unavailable",
        )
    }

    pub fn cache(error: &CacheError) -> Self {
        tracing::error!(error = %error, "Tenant cache lookup failed");
        Self::new(
            TenantResolutionErrorCode::CacheError,
            "Tenant lookup is temporarily unavailable",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let json = serde_json::to_value(TenantResolutionError::not_found()).unwrap();
        assert_eq!(json["code"], "TENANT_NOT_FOUND");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            TenantResolutionErrorCode::TenantNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TenantResolutionErrorCode::TenantDisabled.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TenantResolutionErrorCode::CacheError.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_errors_do_not_leak() {
        let err = TenantResolutionError::database(&StoreError::Unavailable(
            "postgres://user:pw@db".to_string(),
        ));
        assert!(!err.message.contains("postgres"));
        assert_eq!(err.code, TenantResolutionErrorCode::DatabaseError);
    }
}
