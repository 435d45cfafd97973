//! Read cache embedded in the record provider.
//!
//! Slots are keyed by [`CacheKey`] and hold serialized snapshots with a write
//! timestamp. A slot is served only while its age is below the TTL; older or
//! absent slots are misses. Expiry is checked lazily on read: the key space is
//! two families (`"all-records"` plus one `"record:<id>"` per fetched record),
//! and write-time invalidation is the primary consistency mechanism, so there
//! is no background eviction.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Typed get/set/invalidate with TTL, statistics and write epochs |
//! | [`CacheConfig`] | TTL, enable switch and limits |
//! | [`CacheBackend`] | Trait for slot storage |
//! | [`MemoryCache`] | In-memory backend |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`CacheKey`] | Slot key families |
//!
//! ## Example
//!
//! ```rust
//! use user_facade::cache::{CacheConfig, CacheKey, CacheManager, MemoryCache};
//!
//! # tokio_test::block_on(async {
//! let cache = CacheManager::new(CacheConfig::default(), Box::new(MemoryCache::default()));
//! cache.set(&CacheKey::all_records(), &vec![1, 2, 3]).await.unwrap();
//! let hit: Option<Vec<u32>> = cache.get(&CacheKey::all_records()).await.unwrap();
//! assert_eq!(hit, Some(vec![1, 2, 3]));
//! # });
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::CacheKey;
pub use manager::{CacheConfig, CacheManager, CacheStats, FillToken, DEFAULT_TTL};
