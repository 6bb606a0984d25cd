// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU implementation of [`CacheStore`].
//!
//! Stands in for the shared Redis instance in single-node deployments and in
//! tests. Entries expire individually; the mutex is never held across an
//! `.await`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;

use super::{CacheError, CacheResult, CacheStore};
use crate::clock::{Clock, SystemClock};

/// Cached value + expiry bookkeeping.
struct CacheEntry {
    value: String,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.inserted_at);
        age.to_std().map(|age| age <= self.ttl).unwrap_or(true)
    }
}

/// LRU key-value cache with per-entry TTL.
pub struct LruCacheStore {
    cache: Mutex<LruCache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl LruCacheStore {
    /// Create a new cache holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Create a cache that evaluates expiry against `clock`.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every call fails with [`CacheError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of keys currently held (fresh or not).
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether the cache holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.cache
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStore for LruCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_available()?;
        let now = self.clock.now();
        let mut cache = self.lock()?;
        if let Some(entry) = cache.get(key) {
            if entry.is_fresh(now) {
                return Ok(Some(entry.value.clone()));
            }
            // Expired; drop it
            cache.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.check_available()?;
        let inserted_at = self.clock.now();
        self.lock()?.put(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at,
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check_available()?;
        self.lock()?.pop(key);
        Ok(())
    }
}
