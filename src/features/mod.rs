// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Feature Flags
//!
//! Per-tenant boolean toggles over a closed set of flag names, served
//! cache-aside (`tenant:features:{tenantId}`) with defaults for flags the
//! store has no row for.

pub mod service;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use service::{FeatureError, FeatureFlagService};

/// Known feature flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum FeatureName {
    Menu,
    Orders,
    Loyalty,
}

impl FeatureName {
    pub const ALL: [FeatureName; 3] = [FeatureName::Menu, FeatureName::Orders, FeatureName::Loyalty];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Menu => "menu",
            FeatureName::Orders => "orders",
            FeatureName::Loyalty => "loyalty",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Value used when a tenant has no row for this flag.
    pub fn default_enabled(&self) -> bool {
        matches!(self, FeatureName::Menu)
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete flag map for one tenant: every known flag has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(BTreeMap<FeatureName, bool>);

impl Features {
    pub fn is_enabled(&self, name: FeatureName) -> bool {
        self.0
            .get(&name)
            .copied()
            .unwrap_or_else(|| name.default_enabled())
    }

    pub fn set(&mut self, name: FeatureName, enabled: bool) {
        self.0.insert(name, enabled);
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, bool)> + '_ {
        self.0.iter().map(|(name, enabled)| (*name, *enabled))
    }
}

impl Default for Features {
    fn default() -> Self {
        Self(
            FeatureName::ALL
                .into_iter()
                .map(|name| (name, name.default_enabled()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_menu_only() {
        let json = serde_json::to_value(Features::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "menu": true, "orders": false, "loyalty": false })
        );
    }

    #[test]
    fn parse_known_names_only() {
        assert_eq!(FeatureName::parse("orders"), Some(FeatureName::Orders));
        assert_eq!(FeatureName::parse("Orders"), None);
        assert_eq!(FeatureName::parse("reservations"), None);
    }

    #[test]
    fn set_overrides_default() {
        let mut features = Features::default();
        features.set(FeatureName::Loyalty, true);
        assert!(features.is_enabled(FeatureName::Loyalty));
        assert!(features.is_enabled(FeatureName::Menu));
    }
}
