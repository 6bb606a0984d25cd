// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Seams
//!
//! The relational store (tenants, users, feature rows) and the shared
//! key-value cache are external collaborators. This module defines the
//! traits the core consumes and ships in-process implementations used by the
//! standalone binary and by tests.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`] implements [`TenantStore`], [`UserStore`] and
//!   [`FeatureStore`]
//! - [`LruCacheStore`] implements [`CacheStore`] with per-entry TTL
//!
//! Production deployments plug PostgreSQL / Redis adapters in behind the same
//! traits; nothing above this module depends on a concrete backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, StoredUser, Tenant};

pub mod lru_cache;
pub mod memory;

pub use lru_cache::LruCacheStore;
pub use memory::InMemoryStore;

/// Relational store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The query itself failed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Result type for relational store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value cache failure.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Tenant lookups.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find a tenant by its (custom) domain.
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<Tenant>>;

    /// Find a tenant by its platform subdomain label.
    async fn find_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<Tenant>>;

    /// Find a tenant by id.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Tenant>>;
}

/// Tenant-scoped user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user of `tenant_id` by normalized email.
    async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<StoredUser>>;

    /// Find a user of `tenant_id` by id.
    async fn find_user_by_id(&self, tenant_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<StoredUser>>;

    /// Insert a user.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] when the email is already taken in the tenant.
    async fn create_user(&self, user: NewUser) -> StoreResult<StoredUser>;
}

/// One persisted feature flag row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureRow {
    pub tenant_id: Uuid,
    pub feature_name: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Per-tenant feature flag rows.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// All rows stored for the tenant (unknown names included).
    async fn list_features(&self, tenant_id: Uuid) -> StoreResult<Vec<FeatureRow>>;

    /// Insert or update a single flag; last write wins.
    async fn upsert_feature(&self, tenant_id: Uuid, name: &str, enabled: bool)
        -> StoreResult<()>;
}

/// Shared key-value cache with per-key expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; expired keys read as `None`.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
