//! Volatile in-memory record store.

use super::RecordStore;
use crate::types::{Record, RecordDraft, RecordPatch, Role};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Default)]
struct Inner {
    /// Insertion sequence -> record; iteration order is insertion order.
    rows: BTreeMap<u64, Record>,
    /// Identity -> insertion sequence.
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl Inner {
    fn insert(&mut self, record: Record) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(record.id.clone(), seq);
        self.rows.insert(seq, record);
    }

    fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).and_then(|seq| self.rows.get(seq))
    }
}

/// Insertion-ordered store guarded by a single writer lock.
///
/// Every mutation is visible to the next read on the same instance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the two demonstration records.
    pub fn seeded() -> Self {
        let mut inner = Inner::default();
        let now = Utc::now();
        inner.insert(Record {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: Role::Admin,
            created_at: now,
        });
        inner.insert(Record {
            id: "550e8400-e29b-41d4-a716-446655440001".to_string(),
            name: "Jane Smith".to_string(),
            email: "jane@example.com".to_string(),
            role: Role::User,
            created_at: now,
        });
        Self {
            inner: RwLock::new(inner),
        }
    }
}

fn not_found(id: &str) -> Error {
    Error::not_found_with_context(
        NOT_FOUND,
        ErrorContext::new()
            .with_details(format!("id {}", id))
            .with_source("memory_store"),
    )
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, draft: RecordDraft) -> Result<Record> {
        let fields = draft.validate()?;
        let mut inner = self.inner.write().await;
        let id = match fields.id {
            Some(id) if inner.index.contains_key(&id) => {
                return Err(Error::validation_with_context(
                    "Validation error: \"id\" already exists",
                    ErrorContext::new()
                        .with_field_path("id")
                        .with_details(id)
                        .with_source("memory_store"),
                ));
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let record = Record {
            id,
            name: fields.name,
            email: fields.email,
            role: fields.role,
            created_at: Utc::now(),
        };
        inner.insert(record.clone());
        debug!(id = %record.id, "record created");
        Ok(record)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Record> {
        self.inner
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record> {
        let mut inner = self.inner.write().await;
        let seq = *inner.index.get(id).ok_or_else(|| not_found(id))?;
        let existing = inner.rows.get(&seq).ok_or_else(|| not_found(id))?;
        let merged = patch.apply_to(existing)?;
        inner.rows.insert(seq, merged.clone());
        debug!(id = %id, "record updated");
        Ok(merged)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let seq = inner.index.remove(id).ok_or_else(|| not_found(id))?;
        inner.rows.remove(&seq);
        debug!(id = %id, "record deleted");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
