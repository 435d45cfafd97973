//! Store doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use user_facade::store::{MemoryStore, RecordStore};
use user_facade::{Error, ErrorContext, Record, RecordDraft, RecordPatch, Result};

pub const JOHN: &str = "550e8400-e29b-41d4-a716-446655440000";
pub const JANE: &str = "550e8400-e29b-41d4-a716-446655440001";

/// Seeded memory store that counts calls per operation and can be told to
/// stall or fail its fetch-all.
#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    pub fetch_all_calls: AtomicUsize,
    pub fetch_by_id_calls: AtomicUsize,
    fetch_all_delay_ms: AtomicUsize,
    fail_fetch_all: AtomicBool,
}

impl ScriptedStore {
    pub fn seeded() -> Self {
        Self {
            inner: MemoryStore::seeded(),
            ..Default::default()
        }
    }

    pub fn fetch_all_count(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_by_id_count(&self) -> usize {
        self.fetch_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn set_fetch_all_delay(&self, delay: Duration) {
        self.fetch_all_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn set_fail_fetch_all(&self, fail: bool) {
        self.fail_fetch_all.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn create(&self, draft: RecordDraft) -> Result<Record> {
        self.inner.create(draft).await
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Record> {
        self.fetch_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_by_id(id).await
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_all.load(Ordering::SeqCst) {
            return Err(Error::internal_with_context(
                "connection refused",
                ErrorContext::new().with_source("scripted_store"),
            ));
        }
        // snapshot first, then stall: models slow I/O returning data read earlier
        let snapshot = self.inner.fetch_all().await?;
        let delay = self.fetch_all_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        Ok(snapshot)
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
