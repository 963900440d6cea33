//! In-memory document store
//!
//! Used by tests and embedders that do not need persistence. Unlike
//! [`crate::DocumentDb`] it keeps no unique name index, so several
//! documents of one kind may share a name; lookups then report all of them.

use crate::error::{StoreError, StoreResult};
use crate::traits::{AttachedFields, DocumentStore, InsertFilters};
use crate::types::{DocumentKind, DocumentSummary, NewDocument, StoredDocument, WriteOptions};
use largeopt_common::DocumentId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Operation counters, readable from tests
#[derive(Debug, Default)]
pub struct StoreStats {
    pub creates: AtomicU64,
    pub updates: AtomicU64,
    pub deletes: AtomicU64,
    pub name_queries: AtomicU64,
    pub body_reads: AtomicU64,
}

/// In-memory document and attached-field store
pub struct MemoryDocumentStore {
    /// Documents indexed by id
    documents: RwLock<BTreeMap<u64, StoredDocument>>,
    /// Attached fields indexed by document id, then field name
    fields: RwLock<HashMap<u64, HashMap<String, Value>>>,
    /// Registered kinds indexed by name
    kinds: RwLock<HashMap<String, DocumentKind>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    insert_filters: InsertFilters,
    stats: StoreStats,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            fields: RwLock::new(HashMap::new()),
            kinds: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
            insert_filters: InsertFilters::new(),
            stats: StoreStats::default(),
        }
    }

    /// Make every subsequent mutation fail with a storage error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert_filters(&self) -> &InsertFilters {
        &self.insert_filters
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn name_queries(&self) -> u64 {
        self.stats.name_queries.load(Ordering::Relaxed)
    }

    /// Number of stored documents, all kinds
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.kinds.read().contains_key(kind)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(
                "writes disabled on memory store",
            )));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn register_kind(&self, kind: &DocumentKind) -> StoreResult<()> {
        self.kinds.write().insert(kind.name.clone(), kind.clone());
        Ok(())
    }

    fn create_document(
        &self,
        doc: &NewDocument<'_>,
        opts: WriteOptions,
    ) -> StoreResult<DocumentId> {
        self.check_writable()?;
        if !self.is_registered(doc.kind) {
            return Err(StoreError::UnknownKind(doc.kind.to_string()));
        }

        let body = self
            .insert_filters
            .apply(doc.kind, doc.body.clone().unwrap_or_default(), opts);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.documents.write().insert(
            id,
            StoredDocument {
                kind: doc.kind.to_string(),
                name: doc.name.to_string(),
                title: doc.title.to_string(),
                body,
            },
        );
        self.stats.creates.fetch_add(1, Ordering::Relaxed);
        Ok(DocumentId::new(id))
    }

    fn update_body(&self, id: DocumentId, body: &str, opts: WriteOptions) -> StoreResult<()> {
        self.check_writable()?;
        let mut documents = self.documents.write();
        let doc = documents
            .get_mut(&id.get())
            .ok_or(StoreError::NotFound(id))?;

        let body = self.insert_filters.apply(&doc.kind, body.to_string(), opts);
        if body.is_empty() && !opts.allow_empty {
            return Err(StoreError::EmptyContent(id));
        }
        doc.body = body;
        self.stats.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete_document(&self, id: DocumentId) -> StoreResult<bool> {
        self.check_writable()?;
        let removed = self.documents.write().remove(&id.get()).is_some();
        if removed {
            self.fields.write().remove(&id.get());
            self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    fn find_by_name(&self, kind: &str, name: &str) -> StoreResult<Vec<DocumentId>> {
        self.stats.name_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|(_, doc)| doc.kind == kind && doc.name == name)
            .map(|(id, _)| DocumentId::new(*id))
            .collect())
    }

    fn body(&self, id: DocumentId) -> StoreResult<Option<String>> {
        self.stats.body_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .documents
            .read()
            .get(&id.get())
            .map(|doc| doc.body.clone()))
    }

    fn list(&self, kind: &str) -> StoreResult<Vec<DocumentSummary>> {
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|(_, doc)| doc.kind == kind)
            .map(|(id, doc)| DocumentSummary {
                id: DocumentId::new(*id),
                name: doc.name.clone(),
                title: doc.title.clone(),
                body_len: doc.body.len(),
            })
            .collect())
    }
}

impl AttachedFields for MemoryDocumentStore {
    fn field(&self, id: DocumentId, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .fields
            .read()
            .get(&id.get())
            .and_then(|fields| fields.get(key))
            .cloned())
    }

    fn set_field(&self, id: DocumentId, key: &str, value: &Value) -> StoreResult<()> {
        self.check_writable()?;
        if !self.documents.read().contains_key(&id.get()) {
            return Err(StoreError::NotFound(id));
        }
        self.fields
            .write()
            .entry(id.get())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete_field(&self, id: DocumentId, key: &str) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self
            .fields
            .write()
            .get_mut(&id.get())
            .is_some_and(|fields| fields.remove(key).is_some()))
    }
}
