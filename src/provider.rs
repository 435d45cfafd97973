//! Caching facade over a [`RecordStore`].
//!
//! Reads consult the cache first and fall through to the store on a miss,
//! populating the slot before returning. Writes go to the store and, only on
//! success, synchronously invalidate every slot they can have made stale:
//!
//! | Operation | Slots invalidated |
//! |-----------|-------------------|
//! | `create`  | `all-records` |
//! | `update`  | `all-records`, `record:<id>` |
//! | `delete`  | `all-records`, `record:<id>` |
//!
//! Every failure is re-raised with a human-readable prefix
//! (`"Failed to fetch users: User not found"`); its [`ErrorKind`] is kept.
//!
//! [`ErrorKind`]: crate::error_code::ErrorKind

use crate::cache::{
    CacheBackend, CacheConfig, CacheKey, CacheManager, CacheStats, MemoryCache, NullCache,
};
use crate::store::{MemoryStore, RecordStore};
use crate::types::{Record, RecordDraft, RecordPatch};
use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

const FETCH_ALL_FAILED: &str = "Failed to fetch users";
const FETCH_ONE_FAILED: &str = "Failed to fetch user";
const CREATE_FAILED: &str = "Failed to create user";
const UPDATE_FAILED: &str = "Failed to update user";
const DELETE_FAILED: &str = "Failed to delete user";

pub struct RecordProvider {
    store: Arc<dyn RecordStore>,
    cache: CacheManager,
}

impl RecordProvider {
    /// Provider over `store` with an in-memory cache built from `config`, or
    /// no cache at all when it is disabled.
    pub fn new(store: Arc<dyn RecordStore>, config: CacheConfig) -> Self {
        let backend: Box<dyn CacheBackend> = if config.enabled {
            Box::new(MemoryCache::new(config.max_entries))
        } else {
            Box::new(NullCache::new())
        };
        Self::with_cache(store, CacheManager::new(config, backend))
    }

    pub fn with_cache(store: Arc<dyn RecordStore>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    /// Provider over a seeded [`MemoryStore`].
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(Arc::new(MemoryStore::seeded()), config)
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// All records, served from `all-records` when fresh.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        let store = Arc::clone(&self.store);
        self.read_through(&CacheKey::all_records(), || async move {
            store.fetch_all().await
        })
        .await
        .map_err(|e| fail(FETCH_ALL_FAILED, e))
    }

    /// One record, served from `record:<id>` when fresh.
    pub async fn get_by_id(&self, id: &str) -> Result<Record> {
        let store = Arc::clone(&self.store);
        let owned = id.to_string();
        self.read_through(&CacheKey::record(id), || async move {
            store.fetch_by_id(&owned).await
        })
        .await
        .map_err(|e| fail(FETCH_ONE_FAILED, e))
    }

    pub async fn create(&self, draft: RecordDraft) -> Result<Record> {
        let record = self
            .store
            .create(draft)
            .await
            .map_err(|e| fail(CREATE_FAILED, e))?;
        self.cache
            .invalidate(&CacheKey::all_records())
            .await
            .map_err(|e| fail(CREATE_FAILED, e))?;
        Ok(record)
    }

    pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record> {
        let record = self
            .store
            .update(id, patch)
            .await
            .map_err(|e| fail(UPDATE_FAILED, e))?;
        self.invalidate_record(id)
            .await
            .map_err(|e| fail(UPDATE_FAILED, e))?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(id)
            .await
            .map_err(|e| fail(DELETE_FAILED, e))?;
        self.invalidate_record(id)
            .await
            .map_err(|e| fail(DELETE_FAILED, e))
    }

    async fn invalidate_record(&self, id: &str) -> Result<()> {
        self.cache.invalidate(&CacheKey::all_records()).await?;
        self.cache.invalidate(&CacheKey::record(id)).await?;
        Ok(())
    }

    /// Cache-first read. The fill token is taken before the store is asked,
    /// so an invalidation racing this read wins over the population.
    async fn read_through<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get(key).await? {
            return Ok(hit);
        }
        let token = self.cache.begin_fill().await;
        debug!(key = %key, store = self.store.name(), "reading through to store");
        let value = fetch().await?;
        self.cache.fill(key, &value, token).await?;
        Ok(value)
    }
}

fn fail(prefix: &'static str, err: Error) -> Error {
    warn!(kind = %err.kind(), error = %err, "{}", prefix);
    err.wrap(prefix)
}
