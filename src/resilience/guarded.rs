//! The protected read path: `RecordProvider::get_all` behind a breaker.

use super::circuit_breaker::{BreakerOutcome, CircuitBreaker, CircuitBreakerConfig};
use crate::provider::RecordProvider;
use crate::types::Record;
use std::sync::Arc;

/// Breaker bound to the "fetch all" read.
///
/// The dispatcher calls [`GuardedRead::fetch_all`] for the list route and the
/// provider directly for everything else.
pub struct GuardedRead {
    provider: Arc<RecordProvider>,
    breaker: CircuitBreaker,
}

impl GuardedRead {
    pub fn new(provider: Arc<RecordProvider>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new("fetch-all", config),
        }
    }

    /// All records, or the fallback payload while the read path is unhealthy.
    pub async fn fetch_all(&self) -> BreakerOutcome<Vec<Record>> {
        let provider = Arc::clone(&self.provider);
        self.breaker
            .call(|| async move { provider.get_all().await })
            .await
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}
