// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Records shared between the store adapters, the services and the REST API.
//! Wire types use camelCase field names to match the dashboard and customer
//! site clients.
//!
//! ## Model Categories
//!
//! - **Tenants**: one restaurant/organization, resolved per request
//! - **Users**: tenant-scoped accounts with a password hash and a role
//! - **Auth payloads**: login/register/refresh request and response bodies

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Role, UserContext};

// =============================================================================
// Tenants
// =============================================================================

/// Per-tenant settings.
///
/// Only the registration policy is interpreted by this service; everything
/// else is carried through opaquely for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    /// Role given to self-registered users that don't ask for one.
    #[serde(default = "default_registration_role")]
    pub default_role: Role,
    /// Roles a user may request when self-registering.
    #[serde(default = "default_allowed_registration_roles")]
    pub allowed_registration_roles: Vec<Role>,
    /// Remaining, presentation-only settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_registration_role() -> Role {
    Role::Customer
}

fn default_allowed_registration_roles() -> Vec<Role> {
    vec![Role::Customer]
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            default_role: default_registration_role(),
            allowed_registration_roles: default_allowed_registration_roles(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A tenant (restaurant or organization) as stored in the relational store.
///
/// `id` and `domain` never change after provisioning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Primary (custom) domain, lowercase, without port.
    pub domain: String,
    /// Label under the platform domain, if the tenant has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub settings: TenantSettings,
    /// Functional areas provisioned for the tenant.
    #[serde(default)]
    pub enabled_features: Vec<String>,
    /// Disabled tenants resolve to `TENANT_DISABLED`.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Tenant {
    /// Build an active tenant with default settings.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: domain.into().to_ascii_lowercase(),
            subdomain: None,
            settings: TenantSettings::default(),
            enabled_features: Vec::new(),
            active: true,
        }
    }

    /// Attach a platform subdomain label.
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into().to_ascii_lowercase());
        self
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: TenantSettings) -> Self {
        self.settings = settings;
        self
    }
}

// =============================================================================
// Users
// =============================================================================

/// A tenant-scoped user account as stored in the relational store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Normalized (NFKC, lowercase) email.
    pub email: String,
    /// Argon2id PHC string. Never serialized to clients.
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl StoredUser {
    /// Project the stored record into the request-scoped user context.
    pub fn to_context(&self) -> UserContext {
        UserContext {
            id: self.id,
            tenant_id: self.tenant_id,
            email: self.email.clone(),
            role: self.role,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Insert payload for [`crate::storage::UserStore::create_user`].
#[derive(Clone)]
pub struct NewUser {
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("tenant_id", &self.tenant_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Auth payloads
// =============================================================================

/// Body of `POST /api/auth/login`.
#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /api/auth/register`.
#[derive(Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Signed bearer token.
    pub token: String,
    pub user: UserContext,
    pub expires_at: DateTime<Utc>,
}

/// Successful token refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_settings_default_to_customer_registration() {
        let settings: TenantSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.default_role, Role::Customer);
        assert_eq!(settings.allowed_registration_roles, vec![Role::Customer]);
    }

    #[test]
    fn tenant_settings_keep_unknown_keys() {
        let settings: TenantSettings =
            serde_json::from_str(r#"{"defaultRole":"staff","currency":"EUR"}"#).unwrap();
        assert_eq!(settings.default_role, Role::Staff);
        assert_eq!(settings.extra["currency"], "EUR");
    }

    #[test]
    fn tenant_serializes_camel_case() {
        let tenant = Tenant::new("Acme Diner", "ACME.example").with_subdomain("acme");
        let json = serde_json::to_value(&tenant).unwrap();
        assert_eq!(json["domain"], "acme.example");
        assert_eq!(json["subdomain"], "acme");
        assert!(json.get("enabledFeatures").is_some());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let request = LoginRequest {
            email: "a@b.co".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let debug = format!("{request:?}");
        assert!(!debug.contains("hunter2"));

        let user = StoredUser {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "a@b.co".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Owner,
            first_name: None,
            last_name: None,
            phone: None,
            created_at: Utc::now(),
        };
        assert!(!format!("{user:?}").contains("argon2id"));
    }
}
