//! Redb table definitions for persistent document storage.

use redb::TableDefinition;

// Key: document id, Value: bincode-encoded StoredDocument
pub const DOCUMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("documents");
// Key: "kind\x00name", Value: document id (unique per kind and name)
pub const DOCUMENT_NAMES: TableDefinition<&str, u64> = TableDefinition::new("document_names");
// Key: "document_id:field", Value: JSON-encoded field value
pub const FIELDS: TableDefinition<&str, &[u8]> = TableDefinition::new("fields");
// Key: kind name, Value: bincode-encoded DocumentKind
pub const KINDS: TableDefinition<&str, &[u8]> = TableDefinition::new("kinds");
// Key: counter name, Value: next value
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const NEXT_DOCUMENT_ID: &str = "next_document_id";

/// Composite key for the name index.
pub fn name_key(kind: &str, name: &str) -> String {
    format!("{kind}\x00{name}")
}

/// Composite key for an attached field.
pub fn field_key(id: u64, field: &str) -> String {
    format!("{id}:{field}")
}

/// Prefix shared by every field attached to a document.
pub fn field_prefix(id: u64) -> String {
    format!("{id}:")
}
