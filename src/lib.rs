//! # user-facade
//!
//! Data-access facade that sits between a request dispatcher and a record store.
//!
//! ## Overview
//!
//! The crate layers three guarantees over a plain five-operation record store:
//!
//! - **Read cache**: time-bounded (5 minute TTL) cache of the full collection and
//!   of individually fetched records, invalidated synchronously on every
//!   successful write
//! - **Failure isolation**: the "fetch all" read runs behind a circuit breaker
//!   with a per-call timeout, a rolling failure-rate threshold and a fallback
//!   payload
//! - **Typed errors**: every failure carries an [`ErrorKind`] that survives
//!   wrapping and maps to a client-facing status
//!
//! ## Quick Start
//!
//! ```rust
//! use user_facade::config::FacadeConfig;
//! use user_facade::facade::UserFacade;
//! use user_facade::types::RecordDraft;
//!
//! # tokio_test::block_on(async {
//! let facade = UserFacade::in_memory(FacadeConfig::default()).unwrap();
//!
//! let created = facade
//!     .create(RecordDraft::new("Ada Lovelace", "ada@example.com"))
//!     .await
//!     .unwrap();
//! assert_eq!(facade.get(&created.id).await.unwrap(), created);
//!
//! let all = facade.list().await.success().unwrap();
//! assert_eq!(all.len(), 3);
//! # });
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Record, role, create/update inputs and validation |
//! | [`store`] | Store capability trait and the in-memory store |
//! | [`cache`] | TTL cache with write-epoch guarded population |
//! | [`provider`] | Cache-first reads, invalidating writes |
//! | [`resilience`] | Circuit breaker and the guarded read path |
//! | [`facade`] | Owned composition handed to a dispatcher |
//! | [`response`] | Error-to-status/body translation |
//! | [`config`] | Defaults, YAML and environment configuration |
//! | [`telemetry`] | Logging setup for binaries |

pub mod cache;
pub mod config;
pub mod error_code;
pub mod facade;
pub mod provider;
pub mod resilience;
pub mod response;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::FacadeConfig;
pub use error_code::ErrorKind;
pub use facade::UserFacade;
pub use provider::RecordProvider;
pub use resilience::{BreakerOutcome, FallbackResponse};
pub use store::{MemoryStore, RecordStore};
pub use types::{Record, RecordDraft, RecordPatch, Role};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
