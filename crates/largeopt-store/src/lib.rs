//! LargeOpt Store - document persistence and caching backends
//!
//! This crate defines the collaborator interfaces the option registry
//! talks to and ships implementations for them:
//! - [`DocumentStore`] / [`AttachedFields`]: keyed documents with a body
//!   and optional attached fields. [`DocumentDb`] persists them in redb,
//!   [`MemoryDocumentStore`] keeps them in memory.
//! - [`SharedCache`]: a get/set/delete cache shared between registries.
//!   [`MemoryCache`] bounds its size with adaptive replacement.

pub mod cache;
pub mod db;
pub mod error;
pub mod memory;
pub mod tables;
pub mod traits;
pub mod types;

// Re-exports
pub use cache::{CacheStats, MemoryCache, NoopCache};
pub use db::DocumentDb;
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryDocumentStore, StoreStats};
pub use traits::{AttachedFields, DocumentStore, InsertFilter, InsertFilters, SharedCache};
pub use types::{DocumentKind, DocumentSummary, NewDocument, StoredDocument, WriteOptions};
