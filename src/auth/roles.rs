// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles and the permission matrix.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Permissions
///
/// Roles are not ordered: each one maps to an explicit capability set.
///
/// - `Owner` - every action on every resource of the tenant
/// - `Staff` - day-to-day operations (orders, menu) and read access to
///   customers, loyalty, reports and settings
/// - `Customer` - browse the menu, place and view own orders, loyalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Staff,
    Customer,
}

/// Action half of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Resource half of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Menu,
    Orders,
    Customers,
    Loyalty,
    Reports,
    Settings,
    Features,
    Users,
}

/// An `(action, resource)` pair checked against a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub action: Action,
    pub resource: Resource,
}

impl Permission {
    pub const fn new(action: Action, resource: Resource) -> Self {
        Self { action, resource }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self.action {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        let resource = match self.resource {
            Resource::Menu => "menu",
            Resource::Orders => "orders",
            Resource::Customers => "customers",
            Resource::Loyalty => "loyalty",
            Resource::Reports => "reports",
            Resource::Settings => "settings",
            Resource::Features => "features",
            Resource::Users => "users",
        };
        write!(f, "{action}:{resource}")
    }
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::Staff, Role::Customer];

    /// Whether this role may perform `action` on `resource`.
    pub fn has_permission(&self, action: Action, resource: Resource) -> bool {
        use Action::*;
        use Resource::*;

        match self {
            Role::Owner => true,
            Role::Staff => matches!(
                (action, resource),
                (Read, Menu | Orders | Customers | Loyalty | Reports | Settings)
                    | (Create, Orders)
                    | (Update, Orders | Menu)
            ),
            Role::Customer => matches!(
                (action, resource),
                (Read, Menu | Orders | Loyalty) | (Create, Orders)
            ),
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.has_permission(permission.action, permission.resource)
    }

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Some(Role::Owner),
            "staff" => Some(Role::Staff),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl Default for Role {
    /// Least-privileged role.
    fn default() -> Self {
        Role::Customer
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
