// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security event logging.
//!
//! Authentication outcomes, tenant mismatches and permission denials are
//! emitted to the `security` tracing target. Events carry request metadata
//! but never tokens, passwords or hashes.

use axum::http::{header::USER_AGENT, HeaderMap, Method};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Tracing target for security events.
pub const SECURITY_TARGET: &str = "security";

/// Types of security events.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    LoginSucceeded,
    LoginFailed,
    Registered,
    RegistrationFailed,
    TokenRefreshed,
    RefreshRejected,
    AuthenticationFailed,
    TenantMismatch,
    PermissionDenied,
    FeaturesUpdated,
}

impl SecurityEventType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::Registered => "registered",
            Self::RegistrationFailed => "registration_failed",
            Self::TokenRefreshed => "token_refreshed",
            Self::RefreshRejected => "refresh_rejected",
            Self::AuthenticationFailed => "authentication_failed",
            Self::TenantMismatch => "tenant_mismatch",
            Self::PermissionDenied => "permission_denied",
            Self::FeaturesUpdated => "features_updated",
        }
    }
}

/// Request metadata attached to security events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub user_agent: Option<String>,
    /// First `X-Forwarded-For` entry, else `X-Real-IP`.
    pub forwarded_ip: Option<String>,
}

impl RequestMeta {
    pub fn new(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let forwarded_ip = header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .or_else(|| header("x-real-ip"));

        Self {
            method: method.to_string(),
            path: path.to_string(),
            user_agent: header(USER_AGENT.as_str()),
            forwarded_ip,
        }
    }
}

/// A security log entry.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: SecurityEventType,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Tenant claimed by a presented token, when it differs from the request's.
    pub token_tenant_id: Option<Uuid>,
    pub request: Option<RequestMeta>,
    pub success: bool,
    pub error_code: Option<&'static str>,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            tenant_id: None,
            user_id: None,
            token_tenant_id: None,
            request: None,
            success: true,
            error_code: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_token_tenant(mut self, tenant_id: Uuid) -> Self {
        self.token_tenant_id = Some(tenant_id);
        self
    }

    pub fn with_request(mut self, request: RequestMeta) -> Self {
        self.request = Some(request);
        self
    }

    /// Mark as failed with an error code.
    pub fn failed(mut self, error_code: &'static str) -> Self {
        self.success = false;
        self.error_code = Some(error_code);
        self
    }

    /// Write the event: `info` for successes, `warn` for failures.
    pub fn emit(&self) {
        let request = self.request.as_ref();
        let method = request.map(|r| r.method.as_str());
        let path = request.map(|r| r.path.as_str());
        let user_agent = request.and_then(|r| r.user_agent.as_deref());
        let ip = request.and_then(|r| r.forwarded_ip.as_deref());

        if self.success {
            tracing::info!(
                target: SECURITY_TARGET,
                event_id = %self.event_id,
                event = self.event_type.as_str(),
                tenant_id = ?self.tenant_id,
                user_id = ?self.user_id,
                method,
                path,
                user_agent,
                ip,
                "security event"
            );
        } else {
            tracing::warn!(
                target: SECURITY_TARGET,
                event_id = %self.event_id,
                event = self.event_type.as_str(),
                tenant_id = ?self.tenant_id,
                user_id = ?self.user_id,
                token_tenant_id = ?self.token_tenant_id,
                error_code = self.error_code,
                method,
                path,
                user_agent,
                ip,
                "security event"
            );
        }
    }
}
