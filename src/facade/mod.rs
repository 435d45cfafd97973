//! Explicitly owned composition of store, provider and guarded read.
//!
//! There is no process-wide instance: build a [`UserFacade`] at startup and
//! hand it (usually behind an `Arc`) to whatever dispatches requests.

use crate::config::FacadeConfig;
use crate::provider::RecordProvider;
use crate::resilience::{BreakerOutcome, CircuitBreakerSnapshot, GuardedRead};
use crate::response::ErrorResponse;
use crate::store::{MemoryStore, RecordStore};
use crate::types::{Record, RecordDraft, RecordPatch};
use crate::{Error, Result};
use std::sync::Arc;

pub struct UserFacade {
    provider: Arc<RecordProvider>,
    guarded: GuardedRead,
    expose_error_details: bool,
}

impl UserFacade {
    pub fn new(store: Arc<dyn RecordStore>, config: FacadeConfig) -> Result<Self> {
        config.validate()?;
        let provider = Arc::new(RecordProvider::new(store, config.cache));
        let guarded = GuardedRead::new(Arc::clone(&provider), config.breaker);
        Ok(Self {
            provider,
            guarded,
            expose_error_details: config.expose_error_details,
        })
    }

    /// Facade over a seeded in-memory store.
    pub fn in_memory(config: FacadeConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::seeded()), config)
    }

    /// The list route: protected by the breaker, never fails.
    pub async fn list(&self) -> BreakerOutcome<Vec<Record>> {
        self.guarded.fetch_all().await
    }

    pub async fn get(&self, id: &str) -> Result<Record> {
        self.provider.get_by_id(id).await
    }

    pub async fn create(&self, draft: RecordDraft) -> Result<Record> {
        self.provider.create(draft).await
    }

    pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record> {
        self.provider.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.provider.delete(id).await
    }

    /// Status and body for a failed provider call.
    pub fn error_response(&self, err: &Error) -> ErrorResponse {
        ErrorResponse::from_error(err, self.expose_error_details)
    }

    pub fn provider(&self) -> &Arc<RecordProvider> {
        &self.provider
    }

    pub fn breaker_snapshot(&self) -> CircuitBreakerSnapshot {
        self.guarded.breaker().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_returns_seeded_records() {
        let facade = UserFacade::in_memory(FacadeConfig::default()).unwrap();
        let records = facade.list().await.success().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_error_response_uses_configured_detail_level() {
        let facade =
            UserFacade::in_memory(FacadeConfig::new().with_expose_error_details(true)).unwrap();
        let err = facade.get("missing").await.unwrap_err();
        let resp = facade.error_response(&err);
        assert_eq!(resp.status, 404);
        assert!(resp.error.details.is_some());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = FacadeConfig::default();
        cfg.breaker.error_threshold_percentage = 0;
        assert!(UserFacade::in_memory(cfg).is_err());
    }
}
