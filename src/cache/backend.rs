//! Cache backend implementations.

use super::key::CacheKey;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    written_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            written_at: now,
            ttl,
            last_accessed: now,
        }
    }

    /// Valid only while `now - written_at < ttl`.
    fn is_expired(&self) -> bool {
        self.written_at.elapsed() >= self.ttl
    }
}

/// Storage for serialized cache slots.
///
/// Expiry is lazy: an entry past its TTL is treated as absent when read and
/// dropped then, with no background sweep.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;
    /// Overwrites any prior entry for `key` unconditionally.
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()>;
    /// Returns whether an entry was removed. Absent keys are not an error.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    fn name(&self) -> &'static str;
}

pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_if_needed(&self, entries: &mut HashMap<String, CacheEntry>, incoming: &str) {
        entries.retain(|_, e| !e.is_expired());
        if entries.contains_key(incoming) {
            return;
        }
        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                entries.remove(&k);
            } else {
                break;
            }
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::poisoned("memory_cache"))?;
        if let Some(entry) = entries.get_mut(&key.hash) {
            if entry.is_expired() {
                entries.remove(&key.hash);
                return Ok(None);
            }
            entry.last_accessed = Instant::now();
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::poisoned("memory_cache"))?;
        self.evict_if_needed(&mut entries, &key.hash);
        entries.insert(key.hash.clone(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::poisoned("memory_cache"))?;
        Ok(entries.remove(&key.hash).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that never stores anything; every read is a miss.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &[u8], _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
