// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::roles::Role;

/// Claims carried by a bearer token.
///
/// `tenant_id` binds the token to one tenant: it must match the tenant
/// resolved for every request the token is presented on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// The caller of a request, derived from verified claims plus a user lookup.
///
/// Discarded at the end of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserContext {
    /// Check if the user holds a permission.
    pub fn can(&self, action: super::Action, resource: super::Resource) -> bool {
        self.role.has_permission(action, resource)
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Action, Resource};

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            user_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            email: "owner@acme.test".to_string(),
            role: Role::Owner,
            iat: 1_700_000_000,
            exp: 1_700_086_400,
            iss: "tenant-identity".to_string(),
            aud: "tenant-identity-api".to_string(),
        }
    }

    #[test]
    fn claims_use_camel_case() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("tenantId").is_some());
        assert_eq!(json["role"], "owner");
    }

    #[test]
    fn user_context_omits_missing_names() {
        let user = UserContext {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            email: "a@b.test".to_string(),
            role: Role::Staff,
            first_name: None,
            last_name: Some("Lovelace".to_string()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("firstName").is_none());
        assert_eq!(json["lastName"], "Lovelace");
        assert!(user.can(Action::Read, Resource::Orders));
        assert!(!user.is_owner());
    }
}
