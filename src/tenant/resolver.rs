// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tenant resolution service.
//!
//! Hostname → [`DomainInfo`] → tenant cache → tenant store → (optional
//! localhost fallback). Every outcome, including store and cache failures,
//! comes back as a [`TenantResolutionResult`]; nothing is thrown past this
//! boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use super::domain::{DomainInfo, DomainResolver};
use super::error::TenantResolutionError;
use crate::cache::{keys, JsonCache};
use crate::clock::Clock;
use crate::models::Tenant;
use crate::storage::{CacheStore, TenantStore};

/// Default tenant cache TTL (1 hour).
pub const DEFAULT_TENANT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Where a resolved tenant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Cache,
    Store,
}

/// Outcome of a single lookup. Produced fresh per call and never cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResolutionResult {
    pub success: bool,
    pub tenant: Option<Tenant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TenantResolutionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
    pub response_time_ms: u64,
}

impl TenantResolutionResult {
    fn found(tenant: Tenant, source: ResolutionSource, started: Instant) -> Self {
        Self {
            success: true,
            tenant: Some(tenant),
            error: None,
            source: Some(source),
            response_time_ms: elapsed_ms(started),
        }
    }

    fn skipped() -> Self {
        Self {
            success: true,
            tenant: None,
            error: None,
            source: None,
            response_time_ms: 0,
        }
    }

    fn failed(error: TenantResolutionError, started: Instant) -> Self {
        Self {
            success: false,
            tenant: None,
            error: Some(error),
            source: None,
            response_time_ms: elapsed_ms(started),
        }
    }

    /// Collapse into a `Result`; skipped lookups are `Ok(None)`.
    pub fn into_result(self) -> Result<Option<Tenant>, TenantResolutionError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.tenant),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Per-call lookup options.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub use_cache: bool,
    /// Overrides the configured TTL for entries written by this call.
    pub cache_ttl: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl: None,
        }
    }
}

/// Resolution policy.
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    /// Path prefixes that never resolve a tenant (health checks, assets).
    pub skip_paths: Vec<String>,
    /// Path prefixes that fail closed when no tenant resolves.
    pub required_paths: Vec<String>,
    pub cache_ttl: Duration,
    /// Domain to fall back to for localhost requests that match nothing.
    pub fallback_domain: Option<String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            skip_paths: ["/health", "/docs", "/api-doc", "/static", "/favicon.ico"]
                .into_iter()
                .map(String::from)
                .collect(),
            required_paths: vec!["/api".to_string()],
            cache_ttl: DEFAULT_TENANT_CACHE_TTL,
            fallback_domain: None,
        }
    }
}

fn matches_prefix(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        path == prefix
            || path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| prefix.ends_with('/') || rest.starts_with('/'))
    })
}

/// Resolves tenants for inbound requests.
#[derive(Clone)]
pub struct TenantResolutionService {
    domains: DomainResolver,
    store: Arc<dyn TenantStore>,
    cache: JsonCache<Tenant>,
    config: ResolutionConfig,
}

impl TenantResolutionService {
    pub fn new(
        domains: DomainResolver,
        store: Arc<dyn TenantStore>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: ResolutionConfig,
    ) -> Self {
        Self {
            domains,
            store,
            cache: JsonCache::new(cache, clock),
            config,
        }
    }

    pub fn domains(&self) -> &DomainResolver {
        &self.domains
    }

    /// Whether `path` bypasses tenant resolution entirely.
    pub fn should_skip(&self, path: &str) -> bool {
        matches_prefix(path, &self.config.skip_paths)
    }

    /// Whether `path` must fail closed without a tenant.
    pub fn is_required(&self, path: &str) -> bool {
        matches_prefix(path, &self.config.required_paths)
    }

    /// Resolve the tenant of a request: honours the skip list, then
    /// delegates to [`Self::resolve`].
    pub async fn resolve_request(
        &self,
        path: &str,
        host: Option<&str>,
        options: ResolveOptions,
    ) -> TenantResolutionResult {
        if self.should_skip(path) {
            return TenantResolutionResult::skipped();
        }
        self.resolve(host.unwrap_or_default(), options).await
    }

    /// Resolve a tenant from a raw host value.
    pub async fn resolve(&self, host: &str, options: ResolveOptions) -> TenantResolutionResult {
        let started = Instant::now();
        let info = self.domains.parse(host);

        if info.hostname.is_empty() {
            return TenantResolutionResult::failed(TenantResolutionError::invalid_domain(), started);
        }
        if !info.is_well_formed() {
            return TenantResolutionResult::failed(
                TenantResolutionError::parse_error(&info.hostname),
                started,
            );
        }

        let result = match self.lookup(&info, options).await {
            Ok((tenant, source)) => TenantResolutionResult::found(tenant, source, started),
            Err(error) => TenantResolutionResult::failed(error, started),
        };

        tracing::debug!(
            hostname = %info.hostname,
            success = result.success,
            source = ?result.source,
            tenant_id = ?result.tenant.as_ref().map(|t| t.id),
            response_time_ms = result.response_time_ms,
            "Tenant resolution finished"
        );
        result
    }

    /// Resolve a tenant by id (cache key `tenant:id:{id}`).
    pub async fn resolve_by_id(&self, id: Uuid, options: ResolveOptions) -> TenantResolutionResult {
        let started = Instant::now();

        let outcome = self
            .lookup_by_id(id, options)
            .await
            .and_then(|(tenant, source)| ensure_active(tenant).map(|t| (t, source)));

        match outcome {
            Ok((tenant, source)) => TenantResolutionResult::found(tenant, source, started),
            Err(error) => TenantResolutionResult::failed(error, started),
        }
    }

    async fn lookup_by_id(
        &self,
        id: Uuid,
        options: ResolveOptions,
    ) -> Result<(Tenant, ResolutionSource), TenantResolutionError> {
        let key = keys::tenant_id(id);
        if options.use_cache {
            let cached = self
                .cache
                .get(&key)
                .await
                .map_err(|e| TenantResolutionError::cache(&e))?;
            if let Some(tenant) = cached {
                return Ok((tenant, ResolutionSource::Cache));
            }
        }

        let tenant = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| TenantResolutionError::database(&e))?
            .ok_or_else(TenantResolutionError::not_found)?;

        if options.use_cache {
            self.populate(&tenant, options).await;
        }
        Ok((tenant, ResolutionSource::Store))
    }

    /// Drop every cache entry pointing at `tenant`.
    pub async fn invalidate(&self, tenant: &Tenant) -> Result<(), TenantResolutionError> {
        for key in canonical_keys(tenant) {
            self.cache
                .invalidate(&key)
                .await
                .map_err(|e| TenantResolutionError::cache(&e))?;
        }
        tracing::info!(tenant_id = %tenant.id, "Tenant cache invalidated");
        Ok(())
    }

    async fn lookup(
        &self,
        info: &DomainInfo,
        options: ResolveOptions,
    ) -> Result<(Tenant, ResolutionSource), TenantResolutionError> {
        if options.use_cache {
            // Same order as the store lookup: domain, then subdomain.
            let mut candidates = vec![keys::tenant_domain(&info.domain)];
            if let Some(subdomain) = &info.subdomain {
                candidates.push(keys::tenant_subdomain(subdomain));
            }
            for key in candidates {
                let cached = self
                    .cache
                    .get(&key)
                    .await
                    .map_err(|e| TenantResolutionError::cache(&e))?;
                if let Some(tenant) = cached {
                    return ensure_active(tenant).map(|t| (t, ResolutionSource::Cache));
                }
            }
        }

        let tenant = match self.find_in_store(info).await? {
            Some(tenant) => tenant,
            None => return Err(TenantResolutionError::not_found()),
        };

        if options.use_cache {
            self.populate(&tenant, options).await;
        }
        ensure_active(tenant).map(|t| (t, ResolutionSource::Store))
    }

    async fn find_in_store(
        &self,
        info: &DomainInfo,
    ) -> Result<Option<Tenant>, TenantResolutionError> {
        let by_domain = self
            .store
            .find_by_domain(&info.domain)
            .await
            .map_err(|e| TenantResolutionError::database(&e))?;
        if by_domain.is_some() {
            return Ok(by_domain);
        }

        if let Some(subdomain) = &info.subdomain {
            let by_subdomain = self
                .store
                .find_by_subdomain(subdomain)
                .await
                .map_err(|e| TenantResolutionError::database(&e))?;
            if by_subdomain.is_some() {
                return Ok(by_subdomain);
            }
        }

        match (&self.config.fallback_domain, info.is_localhost) {
            (Some(fallback), true) => {
                tracing::debug!(fallback = %fallback, "Using fallback tenant for local request");
                self.store
                    .find_by_domain(fallback)
                    .await
                    .map_err(|e| TenantResolutionError::database(&e))
            }
            _ => Ok(None),
        }
    }

    /// Write-back after a store hit. A failed write only costs a future miss.
    ///
    /// Only the tenant's own keys are written, never the request host, so
    /// [`Self::invalidate`] reaches every entry.
    async fn populate(&self, tenant: &Tenant, options: ResolveOptions) {
        let ttl = options.cache_ttl.unwrap_or(self.config.cache_ttl);
        for key in canonical_keys(tenant) {
            if let Err(e) = self.cache.set(&key, tenant, ttl).await {
                tracing::warn!(key = %key, error = %e, "Failed to cache tenant");
            }
        }
    }
}

/// Every cache key a tenant is stored under.
fn canonical_keys(tenant: &Tenant) -> Vec<String> {
    let mut cache_keys = vec![keys::tenant_domain(&tenant.domain), keys::tenant_id(tenant.id)];
    if let Some(subdomain) = &tenant.subdomain {
        cache_keys.push(keys::tenant_subdomain(subdomain));
    }
    cache_keys
}

fn ensure_active(tenant: Tenant) -> Result<Tenant, TenantResolutionError> {
    if tenant.active {
        Ok(tenant)
    } else {
        Err(TenantResolutionError::disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{InMemoryStore, LruCacheStore};
    use crate::tenant::TenantResolutionErrorCode;

    struct Fixture {
        store: Arc<InMemoryStore>,
        cache: Arc<LruCacheStore>,
        clock: Arc<ManualClock>,
        service: TenantResolutionService,
        tenant: Tenant,
    }

    fn fixture_with(config: ResolutionConfig) -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(LruCacheStore::with_clock(100, clock.clone()));
        let tenant = store.insert_tenant(
            Tenant::new("Acme Diner", "acme-diner.com").with_subdomain("acme"),
        );
        let service = TenantResolutionService::new(
            DomainResolver::new("platform.tld"),
            store.clone(),
            cache.clone(),
            clock.clone(),
            config,
        );
        Fixture {
            store,
            cache,
            clock,
            service,
            tenant,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ResolutionConfig::default())
    }

    #[tokio::test]
    async fn store_then_cache() {
        let f = fixture();

        let first = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert!(first.success);
        assert_eq!(first.source, Some(ResolutionSource::Store));
        assert_eq!(first.tenant.as_ref().map(|t| t.id), Some(f.tenant.id));

        let second = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert_eq!(second.source, Some(ResolutionSource::Cache));
        assert_eq!(second.tenant.map(|t| t.id), Some(f.tenant.id));
    }

    #[tokio::test]
    async fn subdomain_resolves_via_subdomain_lookup() {
        let f = fixture();
        let result = f.service.resolve("acme.platform.tld:443", ResolveOptions::default()).await;
        assert!(result.success);
        assert_eq!(result.tenant.map(|t| t.id), Some(f.tenant.id));
    }

    #[tokio::test]
    async fn cache_ttl_boundary() {
        let f = fixture();
        let options = ResolveOptions {
            use_cache: true,
            cache_ttl: Some(Duration::from_secs(3600)),
        };

        f.service.resolve("acme-diner.com", options).await;
        let queries_after_fill = f.store.tenant_queries();

        f.clock.advance(chrono::Duration::seconds(3599));
        let hit = f.service.resolve("acme-diner.com", options).await;
        assert_eq!(hit.source, Some(ResolutionSource::Cache));
        assert_eq!(f.store.tenant_queries(), queries_after_fill);

        f.clock.advance(chrono::Duration::seconds(2));
        let miss = f.service.resolve("acme-diner.com", options).await;
        assert_eq!(miss.source, Some(ResolutionSource::Store));
        assert!(f.store.tenant_queries() > queries_after_fill);
    }

    #[tokio::test]
    async fn bypassing_the_cache_always_hits_the_store() {
        let f = fixture();
        let options = ResolveOptions {
            use_cache: false,
            cache_ttl: None,
        };
        f.service.resolve("acme-diner.com", options).await;
        let again = f.service.resolve("acme-diner.com", options).await;
        assert_eq!(again.source, Some(ResolutionSource::Store));
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn unknown_host_is_not_found() {
        let f = fixture();
        let result = f.service.resolve("nobody.example", ResolveOptions::default()).await;
        assert!(!result.success);
        assert!(result.tenant.is_none());
        assert_eq!(
            result.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::TenantNotFound)
        );
    }

    #[tokio::test]
    async fn empty_and_malformed_hosts() {
        let f = fixture();
        let empty = f.service.resolve("", ResolveOptions::default()).await;
        assert_eq!(
            empty.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::InvalidDomain)
        );

        let bad = f.service.resolve("bad_host!", ResolveOptions::default()).await;
        assert_eq!(
            bad.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::DomainParseError)
        );
    }

    #[tokio::test]
    async fn store_failure_is_database_error() {
        let f = fixture();
        f.store.set_unavailable(true);
        let result = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert!(!result.success);
        assert_eq!(
            result.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::DatabaseError)
        );
    }

    #[tokio::test]
    async fn cache_failure_is_cache_error() {
        let f = fixture();
        f.cache.set_unavailable(true);
        let result = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert!(!result.success);
        assert_eq!(
            result.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::CacheError)
        );
    }

    #[tokio::test]
    async fn disabled_tenant_is_rejected_even_when_cached() {
        let f = fixture();
        f.service.resolve("acme-diner.com", ResolveOptions::default()).await;

        f.store.set_tenant_active(f.tenant.id, false);
        let mut disabled = f.tenant.clone();
        disabled.active = false;
        f.service.invalidate(&disabled).await.unwrap();

        let result = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert_eq!(
            result.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::TenantDisabled)
        );
        let cached = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert_eq!(
            cached.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::TenantDisabled)
        );
    }

    #[tokio::test]
    async fn resolve_by_id_uses_id_key() {
        let f = fixture();
        let first = f.service.resolve_by_id(f.tenant.id, ResolveOptions::default()).await;
        assert_eq!(first.source, Some(ResolutionSource::Store));
        let second = f.service.resolve_by_id(f.tenant.id, ResolveOptions::default()).await;
        assert_eq!(second.source, Some(ResolutionSource::Cache));

        let missing = f.service.resolve_by_id(Uuid::new_v4(), ResolveOptions::default()).await;
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn invalidate_forces_store_lookup() {
        let f = fixture();
        f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        f.service.invalidate(&f.tenant).await.unwrap();
        let result = f.service.resolve("acme-diner.com", ResolveOptions::default()).await;
        assert_eq!(result.source, Some(ResolutionSource::Store));
    }

    #[tokio::test]
    async fn skip_paths_return_empty_success() {
        let f = fixture();
        let result = f
            .service
            .resolve_request("/health/live", None, ResolveOptions::default())
            .await;
        assert!(result.success);
        assert!(result.tenant.is_none());
        assert_eq!(f.store.tenant_queries(), 0);

        assert!(f.service.should_skip("/static/app.css"));
        assert!(!f.service.should_skip("/healthcheck-admin"));
        assert!(f.service.is_required("/api/auth/login"));
        assert!(!f.service.is_required("/apiary"));
    }

    #[tokio::test]
    async fn invalidate_reaches_localhost_fallback() {
        let f = fixture_with(ResolutionConfig {
            fallback_domain: Some("acme-diner.com".to_string()),
            ..ResolutionConfig::default()
        });
        let first = f.service.resolve("localhost:3000", ResolveOptions::default()).await;
        assert!(first.success);

        f.store.set_tenant_active(f.tenant.id, false);
        let mut disabled = f.tenant.clone();
        disabled.active = false;
        f.service.invalidate(&disabled).await.unwrap();

        for host in ["acme-diner.com", "localhost:3000"] {
            let result = f.service.resolve(host, ResolveOptions::default()).await;
            assert!(!result.success, "{host} still served");
            assert_eq!(
                result.error.map(|e| e.code),
                Some(TenantResolutionErrorCode::TenantDisabled)
            );
        }
    }

    #[tokio::test]
    async fn invalidate_reaches_platform_host_found_by_domain() {
        let f = fixture();
        let tenant = f.store.insert_tenant(Tenant::new("Bistro", "bistro.platform.tld"));

        let first = f.service.resolve("bistro.platform.tld", ResolveOptions::default()).await;
        assert_eq!(first.tenant.map(|t| t.id), Some(tenant.id));
        let cached = f.service.resolve("bistro.platform.tld", ResolveOptions::default()).await;
        assert_eq!(cached.source, Some(ResolutionSource::Cache));

        f.store.set_tenant_active(tenant.id, false);
        let mut disabled = tenant.clone();
        disabled.active = false;
        f.service.invalidate(&disabled).await.unwrap();

        let result = f.service.resolve("bistro.platform.tld", ResolveOptions::default()).await;
        assert_eq!(
            result.error.map(|e| e.code),
            Some(TenantResolutionErrorCode::TenantDisabled)
        );
    }

    #[tokio::test]
    async fn subdomain_hit_is_cached_under_subdomain_key() {
        let f = fixture();
        f.service.resolve("acme.platform.tld", ResolveOptions::default()).await;
        let queries = f.store.tenant_queries();

        let again = f.service.resolve("acme.platform.tld", ResolveOptions::default()).await;
        assert_eq!(again.source, Some(ResolutionSource::Cache));
        assert_eq!(f.store.tenant_queries(), queries);
    }

    #[tokio::test]
    async fn localhost_falls_back_when_configured() {
        let f = fixture_with(ResolutionConfig {
            fallback_domain: Some("acme-diner.com".to_string()),
            ..ResolutionConfig::default()
        });
        let result = f.service.resolve("localhost:3000", ResolveOptions::default()).await;
        assert_eq!(result.tenant.map(|t| t.id), Some(f.tenant.id));

        let remote = f.service.resolve("elsewhere.example", ResolveOptions::default()).await;
        assert!(!remote.success);
    }
}
