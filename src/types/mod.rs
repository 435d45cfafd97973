//! Record types shared by the store, the cache and the provider.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Record`] | A stored user record |
//! | [`Role`] | Closed role enumeration (`user`, `admin`) |
//! | [`RecordDraft`] | Untrusted input for creating a record |
//! | [`RecordPatch`] | Untrusted partial input for updating a record |
//!
//! ## Example
//!
//! ```rust
//! use user_facade::types::{RecordDraft, Role};
//!
//! let draft = RecordDraft::new("Ada Lovelace", "ada@example.com").with_role("admin");
//! let fields = draft.validate().unwrap();
//! assert_eq!(fields.role, Role::Admin);
//! ```

pub mod record;

pub use record::{Record, RecordDraft, RecordPatch, Role, ValidFields};
