//! Collaborator interfaces consumed by the option registry
//!
//! The registry never talks to a concrete backend; it is handed trait
//! objects for the document store, the attached-field store and the
//! shared cache.

use crate::error::StoreResult;
use crate::types::{DocumentKind, DocumentSummary, NewDocument, WriteOptions};
use largeopt_common::DocumentId;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Keyed document repository
pub trait DocumentStore: Send + Sync {
    /// Declare a document kind. Registering the same kind again is a no-op
    /// apart from refreshing its declaration.
    fn register_kind(&self, kind: &DocumentKind) -> StoreResult<()>;

    /// Create a document and return its id
    fn create_document(&self, doc: &NewDocument<'_>, opts: WriteOptions)
    -> StoreResult<DocumentId>;

    /// Replace the body of an existing document
    fn update_body(&self, id: DocumentId, body: &str, opts: WriteOptions) -> StoreResult<()>;

    /// Delete a document and everything attached to it.
    /// Returns false if there was nothing to delete.
    fn delete_document(&self, id: DocumentId) -> StoreResult<bool>;

    /// Ids of all documents of `kind` named `name`
    fn find_by_name(&self, kind: &str, name: &str) -> StoreResult<Vec<DocumentId>>;

    /// Body of a document, `None` if the document does not exist
    fn body(&self, id: DocumentId) -> StoreResult<Option<String>>;

    /// All documents of a kind, ordered by id
    fn list(&self, kind: &str) -> StoreResult<Vec<DocumentSummary>>;
}

/// Per-document attached metadata
pub trait AttachedFields: Send + Sync {
    fn field(&self, id: DocumentId, key: &str) -> StoreResult<Option<Value>>;

    /// Set a field on an existing document
    fn set_field(&self, id: DocumentId, key: &str, value: &Value) -> StoreResult<()>;

    /// Returns false if the field was not set
    fn delete_field(&self, id: DocumentId, key: &str) -> StoreResult<bool>;
}

/// Cache shared between registries (and, for external backends, processes)
pub trait SharedCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn delete(&self, key: &str);
}

/// Host-side body transformer applied on create and update.
/// Receives the document kind and the body.
pub type InsertFilter = Arc<dyn Fn(&str, String) -> String + Send + Sync>;

/// Ordered list of insert filters owned by a store
#[derive(Default)]
pub struct InsertFilters {
    filters: RwLock<Vec<InsertFilter>>,
}

impl InsertFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter; filters run in registration order
    pub fn add(&self, filter: InsertFilter) {
        self.filters.write().push(filter);
    }

    pub fn clear(&self) {
        self.filters.write().clear();
    }

    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the filters over `body` unless the write options skip them
    pub fn apply(&self, kind: &str, body: String, opts: WriteOptions) -> String {
        if opts.skip_insert_filters {
            return body;
        }
        let filters = self.filters.read().clone();
        filters.iter().fold(body, |body, filter| filter(kind, body))
    }
}
