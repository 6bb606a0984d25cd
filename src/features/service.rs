// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cache-aside feature flag reads and owner updates.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use uuid::Uuid;

use super::{FeatureName, Features};
use crate::cache::{keys, JsonCache};
use crate::clock::Clock;
use crate::error::ApiError;
use crate::storage::{CacheError, CacheStore, FeatureStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("unknown feature flags: {}", .0.join(", "))]
    UnknownFlags(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<FeatureError> for ApiError {
    fn from(error: FeatureError) -> Self {
        match error {
            FeatureError::UnknownFlags(names) => {
                ApiError::bad_request("Request contains unknown feature flags")
                    .with_details(serde_json::json!({ "unknownFlags": names }))
            }
            FeatureError::Store(e) => {
                tracing::error!(error = %e, "Feature store operation failed");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "database_error",
                    "Feature flags are temporarily unavailable",
                )
            }
            FeatureError::Cache(e) => {
                tracing::error!(error = %e, "Feature cache operation failed");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "cache_error",
                    "Feature flags are temporarily unavailable",
                )
            }
        }
    }
}

/// Per-tenant feature flags.
#[derive(Clone)]
pub struct FeatureFlagService {
    store: Arc<dyn FeatureStore>,
    cache: JsonCache<Features>,
    ttl: Duration,
}

impl FeatureFlagService {
    pub fn new(
        store: Arc<dyn FeatureStore>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache: JsonCache::new(cache, clock),
            ttl,
        }
    }

    /// Flags for a tenant, defaults filled in.
    ///
    /// A cache outage falls through to the store; a store outage is an error.
    pub async fn get_tenant_features(&self, tenant_id: Uuid) -> Result<Features, FeatureError> {
        let key = keys::tenant_features(tenant_id);

        match self.cache.get(&key).await {
            Ok(Some(features)) => return Ok(features),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Feature cache read failed");
            }
        }

        let mut features = Features::default();
        for row in self.store.list_features(tenant_id).await? {
            match FeatureName::parse(&row.feature_name) {
                Some(name) => features.set(name, row.enabled),
                None => tracing::debug!(
                    tenant_id = %tenant_id,
                    feature = %row.feature_name,
                    "Ignoring unknown stored feature flag"
                ),
            }
        }

        if let Err(e) = self.cache.set(&key, &features, self.ttl).await {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to cache feature flags");
        }
        Ok(features)
    }

    /// Apply a partial update and return the resulting flags.
    ///
    /// Unknown names reject the whole update before anything is written.
    /// Each flag is upserted (last write wins), then the cached map is
    /// dropped so the next read sees the store.
    pub async fn update_tenant_features(
        &self,
        tenant_id: Uuid,
        changes: &BTreeMap<String, bool>,
    ) -> Result<Features, FeatureError> {
        let mut parsed = Vec::with_capacity(changes.len());
        let mut unknown = Vec::new();
        for (name, enabled) in changes {
            match FeatureName::parse(name) {
                Some(flag) => parsed.push((flag, *enabled)),
                None => unknown.push(name.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(FeatureError::UnknownFlags(unknown));
        }

        for (flag, enabled) in &parsed {
            self.store
                .upsert_feature(tenant_id, flag.as_str(), *enabled)
                .await?;
        }
        self.cache.invalidate(&keys::tenant_features(tenant_id)).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            changed = parsed.len(),
            "Feature flags updated"
        );
        self.get_tenant_features(tenant_id).await
    }

    pub async fn is_enabled(&self, tenant_id: Uuid, name: FeatureName) -> Result<bool, FeatureError> {
        Ok(self.get_tenant_features(tenant_id).await?.is_enabled(name))
    }
}
