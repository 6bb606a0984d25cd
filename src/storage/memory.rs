// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory relational store.
//!
//! Implements the tenant, user and feature-flag adapters over plain maps.
//! Used by the standalone binary (seeded from the environment) and by tests,
//! which can also simulate an outage and count tenant queries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{FeatureRow, FeatureStore, StoreError, StoreResult, TenantStore, UserStore};
use crate::models::{NewUser, StoredUser, Tenant};

#[derive(Default)]
struct Tables {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, StoredUser>,
    features: HashMap<(Uuid, String), FeatureRow>,
}

/// Map-backed implementation of every relational adapter.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    tenant_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tenant record (provisioning).
    pub fn insert_tenant(&self, tenant: Tenant) -> Tenant {
        if let Ok(mut tables) = self.tables.write() {
            tables.tenants.insert(tenant.id, tenant.clone());
        }
        tenant
    }

    /// Flip a tenant's `active` flag.
    pub fn set_tenant_active(&self, tenant_id: Uuid, active: bool) {
        if let Ok(mut tables) = self.tables.write() {
            if let Some(tenant) = tables.tenants.get_mut(&tenant_id) {
                tenant.active = active;
            }
        }
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of tenant lookups served so far.
    pub fn tenant_queries(&self) -> usize {
        self.tenant_queries.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection timed out".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .read()
            .map_err(|_| StoreError::Query("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .write()
            .map_err(|_| StoreError::Query("store lock poisoned".to_string()))
    }

    fn find_tenant(&self, predicate: impl Fn(&Tenant) -> bool) -> StoreResult<Option<Tenant>> {
        self.tenant_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()?
            .tenants
            .values()
            .find(|tenant| predicate(tenant))
            .cloned())
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<Tenant>> {
        self.find_tenant(|tenant| tenant.domain.eq_ignore_ascii_case(domain))
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<Tenant>> {
        self.find_tenant(|tenant| {
            tenant
                .subdomain
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(subdomain))
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        self.find_tenant(|tenant| tenant.id == id)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<StoredUser>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.tenant_id == tenant_id && user.email == email)
            .cloned())
    }

    async fn find_user_by_id(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<StoredUser>> {
        Ok(self
            .read()?
            .users
            .get(&user_id)
            .filter(|user| user.tenant_id == tenant_id)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<StoredUser> {
        let mut tables = self.write()?;

        let taken = tables
            .users
            .values()
            .any(|existing| existing.tenant_id == user.tenant_id && existing.email == user.email);
        if taken {
            return Err(StoreError::Conflict(format!(
                "users_tenant_email_key ({})",
                user.tenant_id
            )));
        }

        let stored = StoredUser {
            id: Uuid::new_v4(),
            tenant_id: user.tenant_id,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            created_at: Utc::now(),
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl FeatureStore for InMemoryStore {
    async fn list_features(&self, tenant_id: Uuid) -> StoreResult<Vec<FeatureRow>> {
        let mut rows: Vec<FeatureRow> = self
            .read()?
            .features
            .values()
            .filter(|row| row.tenant_id == tenant_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.feature_name.cmp(&b.feature_name));
        Ok(rows)
    }

    async fn upsert_feature(&self, tenant_id: Uuid, name: &str, enabled: bool) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.features.insert(
            (tenant_id, name.to_string()),
            FeatureRow {
                tenant_id,
                feature_name: name.to_string(),
                enabled,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn new_user(tenant_id: Uuid, email: &str) -> NewUser {
        NewUser {
            tenant_id,
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            role: Role::Customer,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn tenant_lookups() {
        let store = InMemoryStore::new();
        let tenant = store.insert_tenant(Tenant::new("Acme", "acme.example").with_subdomain("acme"));

        let by_domain = store.find_by_domain("ACME.example").await.unwrap();
        assert_eq!(by_domain.map(|t| t.id), Some(tenant.id));

        let by_sub = store.find_by_subdomain("acme").await.unwrap();
        assert_eq!(by_sub.map(|t| t.id), Some(tenant.id));

        let by_id = store.find_by_id(tenant.id).await.unwrap();
        assert!(by_id.is_some());

        assert!(store.find_by_domain("other.example").await.unwrap().is_none());
        assert_eq!(store.tenant_queries(), 4);
    }

    #[tokio::test]
    async fn users_are_unique_per_tenant() {
        let store = InMemoryStore::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        store.create_user(new_user(tenant_a, "dup@x.com")).await.unwrap();
        let again = store.create_user(new_user(tenant_a, "dup@x.com")).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        // Same email in another tenant is a different account
        store.create_user(new_user(tenant_b, "dup@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn user_lookup_is_tenant_scoped() {
        let store = InMemoryStore::new();
        let tenant_a = Uuid::new_v4();
        let user = store.create_user(new_user(tenant_a, "a@x.com")).await.unwrap();

        assert!(store.find_user_by_id(tenant_a, user.id).await.unwrap().is_some());
        assert!(store
            .find_user_by_id(Uuid::new_v4(), user.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_user_by_email(Uuid::new_v4(), "a@x.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn feature_upsert_is_last_write_wins() {
        let store = InMemoryStore::new();
        let tenant = Uuid::new_v4();
        store.upsert_feature(tenant, "orders", true).await.unwrap();
        store.upsert_feature(tenant, "orders", false).await.unwrap();

        let rows = store.list_features(tenant).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].enabled);
    }

    #[tokio::test]
    async fn unavailable_store_errors() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_by_domain("acme.example").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
