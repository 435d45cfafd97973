//! Failure isolation for the read path.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Rolling-window circuit breaker with timeout and fallback |
//! | [`guarded`] | The breaker bound to the provider's fetch-all read |
//!
//! ## Circuit Breaker
//!
//! - **Closed**: calls pass through; successes, failures and timeouts are counted
//! - **Open**: calls return the fallback payload without touching the operation
//! - **Half-Open**: one trial call decides whether to close or re-open
//!
//! ```rust
//! use user_facade::resilience::circuit_breaker::{
//!     BreakerOutcome, CircuitBreaker, CircuitBreakerConfig,
//! };
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = CircuitBreakerConfig::new()
//!     .with_timeout(Duration::from_millis(500))
//!     .with_reset_timeout(Duration::from_secs(30));
//! let breaker = CircuitBreaker::new("lookup", config);
//!
//! let out: BreakerOutcome<u32> = breaker.call(|| async { Ok(42) }).await;
//! assert_eq!(out.success(), Some(42));
//! # });
//! ```

pub mod circuit_breaker;
pub mod guarded;

pub use circuit_breaker::{
    BreakerOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState,
    FallbackReason, FallbackResponse,
};
pub use guarded::GuardedRead;
