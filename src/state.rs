// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthService, PasswordHasher, TokenCodec};
use crate::clock::Clock;
use crate::config::{AppConfig, ConfigError};
use crate::features::FeatureFlagService;
use crate::storage::{CacheStore, FeatureStore, TenantStore, UserStore};
use crate::tenant::{DomainResolver, TenantResolutionService};

/// External collaborators the services are wired against.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn TenantStore>,
    pub users: Arc<dyn UserStore>,
    pub features: Arc<dyn FeatureStore>,
    pub cache: Arc<dyn CacheStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tenants: Arc<TenantResolutionService>,
    pub auth: Arc<AuthService>,
    pub features: Arc<FeatureFlagService>,
    /// Shared cache, probed by readiness checks.
    pub cache: Arc<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every service from configuration.
    ///
    /// # Errors
    /// Fails when the signing secret or the password hash parameters are
    /// unusable.
    pub fn new(config: AppConfig, stores: Stores, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let tokens = TokenCodec::new(&config.token, clock.clone())?;
        let hasher = PasswordHasher::new(config.password_hash_cost, config.password_hash_memory_kib)?;

        let tenants = TenantResolutionService::new(
            DomainResolver::new(config.platform_domain.clone()),
            stores.tenants,
            stores.cache.clone(),
            clock.clone(),
            config.resolution(),
        );
        let features = FeatureFlagService::new(
            stores.features,
            stores.cache.clone(),
            clock.clone(),
            config.feature_cache_ttl,
        );
        let auth = AuthService::new(stores.users, hasher, tokens);

        Ok(Self {
            config: Arc::new(config),
            tenants: Arc::new(tenants),
            auth: Arc::new(auth),
            features: Arc::new(features),
            cache: stores.cache,
            clock,
        })
    }
}

#[cfg(test)]
pub mod test_support {
    //! Fully wired state over in-memory stores and a manual clock.

    use super::*;
    use crate::auth::{Role, UserContext};
    use crate::clock::ManualClock;
    use crate::models::{NewUser, Tenant};
    use crate::storage::{InMemoryStore, LruCacheStore};

    pub const TEST_SECRET: &str = "test-secret-with-at-least-32-bytes!!";
    pub const TEST_PASSWORD: &str = "Correct-Horse-42";

    pub struct TestApp {
        pub state: AppState,
        pub store: Arc<InMemoryStore>,
        pub cache: Arc<LruCacheStore>,
        pub clock: Arc<ManualClock>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let mut config = AppConfig::with_secret(TEST_SECRET);
            config.platform_domain = "platform.test".to_string();
            config.password_hash_cost = 1;
            config.password_hash_memory_kib = 1024;
            Self::with_config(config)
        }

        pub fn with_config(config: AppConfig) -> Self {
            let clock = Arc::new(ManualClock::starting_now());
            let store = Arc::new(InMemoryStore::new());
            let cache = Arc::new(LruCacheStore::with_clock(1_000, clock.clone()));
            let stores = Stores {
                tenants: store.clone(),
                users: store.clone(),
                features: store.clone(),
                cache: cache.clone(),
            };
            let state = AppState::new(config, stores, clock.clone()).expect("test state");
            Self {
                state,
                store,
                cache,
                clock,
            }
        }

        /// Create a user with [`TEST_PASSWORD`] and sign a token for it.
        pub async fn user(&self, tenant: &Tenant, email: &str, role: Role) -> (UserContext, String) {
            let hasher = PasswordHasher::new(1, 1024).expect("hasher");
            let stored = self
                .store
                .create_user(NewUser {
                    tenant_id: tenant.id,
                    email: email.to_string(),
                    password_hash: hasher.hash(TEST_PASSWORD).expect("hash"),
                    role,
                    first_name: Some("Test".to_string()),
                    last_name: Some("User".to_string()),
                    phone: None,
                })
                .await
                .expect("create user");
            let user = stored.to_context();
            let issued = self.state.auth.tokens().sign(&user).expect("sign");
            (user, issued.token)
        }
    }
}
