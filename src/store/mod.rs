//! Record store capability.
//!
//! [`RecordStore`] is the named set of five operations the provider depends
//! on. Concrete stores implement it; callers hold `Arc<dyn RecordStore>` and
//! never see how records are kept.
//!
//! Failure contract:
//! - `create` / `update` fail with a validation error when the (merged) fields
//!   break the record schema, and leave the store untouched.
//! - `fetch_by_id` / `update` / `delete` fail with a not-found error when the
//!   identity does not resolve.
//!
//! | Store | Description |
//! |-------|-------------|
//! | [`MemoryStore`] | Volatile, insertion-ordered in-memory store |

mod memory;

pub use memory::MemoryStore;

use crate::types::{Record, RecordDraft, RecordPatch};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Validate, assign identity when absent, stamp creation time, store.
    async fn create(&self, draft: RecordDraft) -> Result<Record>;
    async fn fetch_by_id(&self, id: &str) -> Result<Record>;
    /// All records in insertion order.
    async fn fetch_all(&self) -> Result<Vec<Record>>;
    /// Merge `patch` onto the existing record, re-validate, persist.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record>;
    async fn delete(&self, id: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}
