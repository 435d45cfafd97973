//! Cache manager.

use super::backend::CacheBackend;
use super::key::CacheKey;
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default time-to-live for cached reads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            enabled: true,
            max_entries: 1024,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub invalidations: u64,
    /// Populations dropped because an invalidation landed after the fill began.
    pub discarded: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    invalidations: AtomicU64,
    discarded: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Proof that a read-through population started at a given write epoch.
///
/// Take it before reading the source of truth, hand it to
/// [`CacheManager::fill`] afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillToken {
    epoch: u64,
}

/// Typed cache over a [`CacheBackend`].
///
/// Values are stored as serialized snapshots, so a cached record can never be
/// mutated through a reference handed out earlier. Every invalidation bumps a
/// write epoch under the same lock that guards conditional population, which
/// keeps a slow miss from resurrecting data an invalidation already removed.
pub struct CacheManager {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
    epoch: Mutex<u64>,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        debug!(
            backend = backend.name(),
            ttl_ms = config.default_ttl.as_millis() as u64,
            enabled = config.enabled,
            "cache ready"
        );
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
            epoch: Mutex::new(0),
        }
    }

    /// Present-and-fresh value for `key`, or `None` on a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.backend.get(key).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(val) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "cache hit");
                    Ok(Some(val))
                }
                Err(_) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    Ok(None)
                }
            },
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache miss");
                Ok(None)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Unconditional write with the default TTL.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let _guard = self.epoch.lock().await;
        self.store(key, value).await.map(|_| ())
    }

    /// Start a read-through population.
    pub async fn begin_fill(&self) -> FillToken {
        FillToken {
            epoch: *self.epoch.lock().await,
        }
    }

    /// Write `value` unless an invalidation happened since `token` was taken.
    /// Returns whether the value was stored.
    pub async fn fill<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        token: FillToken,
    ) -> Result<bool> {
        let guard = self.epoch.lock().await;
        if *guard != token.epoch {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "stale cache population discarded");
            return Ok(false);
        }
        self.store(key, value).await
    }

    /// Remove `key`. Absent keys are a no-op.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let mut guard = self.epoch.lock().await;
        *guard += 1;
        if !self.config.enabled {
            return Ok(false);
        }
        match self.backend.delete(key).await {
            Ok(removed) => {
                self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, removed, "cache invalidated");
                Ok(removed)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    /// Caller holds the epoch lock. Returns whether the slot was written.
    async fn store<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        let data = serde_json::to_vec(value)?;
        match self
            .backend
            .set(key, &data, self.config.default_ttl)
            .await
        {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, bytes = data.len(), "cache set");
                Ok(true)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
