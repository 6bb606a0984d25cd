// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cache-aside helpers over a [`CacheStore`].
//!
//! Values are stored as JSON envelopes carrying their own `cachedAt` and
//! `ttlSeconds`, so an entry is only served while
//! `now - cachedAt <= ttlSeconds`, independent of the backend's own expiry.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::{CacheResult, CacheStore};

/// Cache key formats shared with every other reader/writer of the cache.
pub mod keys {
    use uuid::Uuid;

    pub fn tenant_domain(domain: &str) -> String {
        format!("tenant:domain:{domain}")
    }

    pub fn tenant_subdomain(subdomain: &str) -> String {
        format!("tenant:subdomain:{subdomain}")
    }

    pub fn tenant_id(id: Uuid) -> String {
        format!("tenant:id:{id}")
    }

    pub fn tenant_features(tenant_id: Uuid) -> String {
        format!("tenant:features:{tenant_id}")
    }
}

/// Stored form of a cached value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope<T> {
    pub payload: T,
    pub cached_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl<T> CacheEnvelope<T> {
    /// Whether the entry may still be served at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at).num_milliseconds();
        age <= i64::try_from(self.ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }
}

/// Typed JSON cache for one kind of value.
pub struct JsonCache<T> {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> JsonCache<T> {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            _marker: PhantomData,
        }
    }

    /// Read a fresh value.
    ///
    /// Stale or undecodable entries are deleted and read as a miss; only
    /// backend failures are returned as errors.
    pub async fn get(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEnvelope<T>>(&raw) {
            Ok(envelope) if envelope.is_fresh(self.clock.now()) => Ok(Some(envelope.payload)),
            Ok(_) => {
                self.store.delete(key).await?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                self.store.delete(key).await?;
                Ok(None)
            }
        }
    }

    /// Write a value with the given TTL.
    pub async fn set(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Clone,
    {
        let envelope = CacheEnvelope {
            payload: value.clone(),
            cached_at: self.clock.now(),
            ttl_seconds: ttl.as_secs(),
        };
        let raw = serde_json::to_string(&envelope)?;
        self.store.set(key, raw, ttl).await
    }

    /// Remove a key.
    pub async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.store.delete(key).await
    }
}
