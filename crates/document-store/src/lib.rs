//! Versioned document store.
//!
//! Every document carries a [`Version`] that acts as an optimistic
//! concurrency token: writes name the version they expect to replace and
//! fail with [`StoreError::VersionConflict`] when another writer got there
//! first. One [`VersionedStore`] is instantiated per aggregate type, backed
//! either by memory or by PostgreSQL.

pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod version;

pub use document::Document;
pub use error::{Result, StoreError};
pub use filter::{Condition, Filter};
pub use memory::InMemoryStore;
pub use postgres::{PostgresStore, run_migrations};
pub use store::{StoreExt, VersionedStore};
pub use version::Version;
