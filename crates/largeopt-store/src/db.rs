//! Persistent document store backed by redb.
//!
//! Documents, the (kind, name) index, attached fields and registered kinds
//! each live in their own table. Every mutation runs in a single write
//! transaction, so a document and its index entry are created and removed
//! together.

use crate::error::{StoreError, StoreResult};
use crate::tables;
use crate::traits::{AttachedFields, DocumentStore, InsertFilters};
use crate::types::{DocumentKind, DocumentSummary, NewDocument, StoredDocument, WriteOptions};
use largeopt_common::DocumentId;
use redb::{Database, ReadableTable};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};

/// Persistent document store backed by redb.
pub struct DocumentDb {
    db: Database,
    insert_filters: InsertFilters,
}

impl DocumentDb {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create all tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::DOCUMENTS)?;
            let _t = write_txn.open_table(tables::DOCUMENT_NAMES)?;
            let _t = write_txn.open_table(tables::FIELDS)?;
            let _t = write_txn.open_table(tables::KINDS)?;
            let _t = write_txn.open_table(tables::SEQUENCES)?;
        }
        write_txn.commit()?;

        debug!("Opened document database at {}", path.display());
        Ok(Self {
            db,
            insert_filters: InsertFilters::new(),
        })
    }

    /// Host-side body filters run on create and update
    pub fn insert_filters(&self) -> &InsertFilters {
        &self.insert_filters
    }

    /// Look up a registered kind
    pub fn kind(&self, name: &str) -> StoreResult<Option<DocumentKind>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::KINDS)?;
        match table.get(name)? {
            Some(val) => Ok(Some(bincode::deserialize(val.value())?)),
            None => Ok(None),
        }
    }

    fn load_document(&self, id: DocumentId) -> StoreResult<Option<StoredDocument>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::DOCUMENTS)?;
        match table.get(id.get())? {
            Some(val) => Ok(Some(bincode::deserialize(val.value())?)),
            None => Ok(None),
        }
    }
}

impl DocumentStore for DocumentDb {
    fn register_kind(&self, kind: &DocumentKind) -> StoreResult<()> {
        let bytes = bincode::serialize(kind)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::KINDS)?;
            table.insert(kind.name.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        debug!("Registered document kind '{}'", kind.name);
        Ok(())
    }

    fn create_document(
        &self,
        doc: &NewDocument<'_>,
        opts: WriteOptions,
    ) -> StoreResult<DocumentId> {
        let body = self
            .insert_filters
            .apply(doc.kind, doc.body.clone().unwrap_or_default(), opts);
        let stored = StoredDocument {
            kind: doc.kind.to_string(),
            name: doc.name.to_string(),
            title: doc.title.to_string(),
            body,
        };
        let bytes = bincode::serialize(&stored)?;
        let index_key = tables::name_key(doc.kind, doc.name);

        let write_txn = self.db.begin_write()?;
        let id = {
            let kinds = write_txn.open_table(tables::KINDS)?;
            if kinds.get(doc.kind)?.is_none() {
                return Err(StoreError::UnknownKind(doc.kind.to_string()));
            }

            let mut names = write_txn.open_table(tables::DOCUMENT_NAMES)?;
            if names.get(index_key.as_str())?.is_some() {
                return Err(StoreError::Conflict {
                    kind: doc.kind.to_string(),
                    name: doc.name.to_string(),
                });
            }

            let mut sequences = write_txn.open_table(tables::SEQUENCES)?;
            let id = sequences
                .get(tables::NEXT_DOCUMENT_ID)?
                .map_or(1, |val| val.value());
            sequences.insert(tables::NEXT_DOCUMENT_ID, id + 1)?;

            let mut documents = write_txn.open_table(tables::DOCUMENTS)?;
            documents.insert(id, bytes.as_slice())?;
            names.insert(index_key.as_str(), id)?;
            id
        };
        write_txn.commit()?;

        Ok(DocumentId::new(id))
    }

    fn update_body(&self, id: DocumentId, body: &str, opts: WriteOptions) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut documents = write_txn.open_table(tables::DOCUMENTS)?;
            // Decode, then drop the guard before mutating
            let mut stored: StoredDocument = match documents.get(id.get())? {
                Some(val) => bincode::deserialize(val.value())?,
                None => return Err(StoreError::NotFound(id)),
            };

            stored.body = self.insert_filters.apply(&stored.kind, body.to_string(), opts);
            if stored.body.is_empty() && !opts.allow_empty {
                return Err(StoreError::EmptyContent(id));
            }

            let bytes = bincode::serialize(&stored)?;
            documents.insert(id.get(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_document(&self, id: DocumentId) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let mut documents = write_txn.open_table(tables::DOCUMENTS)?;
            let stored: StoredDocument = match documents.remove(id.get())? {
                Some(val) => bincode::deserialize(val.value())?,
                None => return Ok(false),
            };

            let mut names = write_txn.open_table(tables::DOCUMENT_NAMES)?;
            names.remove(tables::name_key(&stored.kind, &stored.name).as_str())?;

            // Field keys sort by document prefix; collect them first, then delete
            let mut fields = write_txn.open_table(tables::FIELDS)?;
            let prefix = tables::field_prefix(id.get());
            let mut keys = Vec::new();
            for entry in fields.range(prefix.as_str()..)? {
                let entry = entry?;
                let k = entry.0.value().to_string();
                if !k.starts_with(&prefix) {
                    break;
                }
                keys.push(k);
            }
            for key in &keys {
                fields.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(true)
    }

    fn find_by_name(&self, kind: &str, name: &str) -> StoreResult<Vec<DocumentId>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::DOCUMENT_NAMES)?;
        let index_key = tables::name_key(kind, name);
        Ok(table
            .get(index_key.as_str())?
            .map(|val| DocumentId::new(val.value()))
            .into_iter()
            .collect())
    }

    fn body(&self, id: DocumentId) -> StoreResult<Option<String>> {
        Ok(self.load_document(id)?.map(|doc| doc.body))
    }

    fn list(&self, kind: &str) -> StoreResult<Vec<DocumentSummary>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::DOCUMENTS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let id = entry.0.value();
            match bincode::deserialize::<StoredDocument>(entry.1.value()) {
                Ok(doc) if doc.kind == kind => result.push(DocumentSummary {
                    id: DocumentId::new(id),
                    body_len: doc.body.len(),
                    name: doc.name,
                    title: doc.title,
                }),
                Ok(_) => {}
                Err(e) => error!("Failed to decode document '{}': {}", id, e),
            }
        }
        Ok(result)
    }
}

impl AttachedFields for DocumentDb {
    fn field(&self, id: DocumentId, key: &str) -> StoreResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::FIELDS)?;
        match table.get(tables::field_key(id.get(), key).as_str())? {
            Some(val) => Ok(Some(serde_json::from_slice(val.value())?)),
            None => Ok(None),
        }
    }

    fn set_field(&self, id: DocumentId, key: &str, value: &Value) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let documents = write_txn.open_table(tables::DOCUMENTS)?;
            if documents.get(id.get())?.is_none() {
                return Err(StoreError::NotFound(id));
            }
            let mut fields = write_txn.open_table(tables::FIELDS)?;
            fields.insert(tables::field_key(id.get(), key).as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_field(&self, id: DocumentId, key: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut fields = write_txn.open_table(tables::FIELDS)?;
            fields
                .remove(tables::field_key(id.get(), key).as_str())?
                .is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
