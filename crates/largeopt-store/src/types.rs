//! Stored types for document persistence.
//!
//! Documents and kinds are serialized to redb via bincode. Attached field
//! values are kept as JSON so arbitrary structured data survives.

use largeopt_common::DocumentId;
use serde::{Deserialize, Serialize};

/// Declaration of a document kind, registered once per store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKind {
    pub name: String,
    pub label: String,
    pub singular_label: String,
    pub public: bool,
    pub publicly_queryable: bool,
    pub exclude_from_search: bool,
    pub show_ui: bool,
    pub can_export: bool,
    pub delete_with_user: bool,
}

impl DocumentKind {
    /// The hidden, exportable kind that backs large options.
    pub fn large_option(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: "Large Options".to_string(),
            singular_label: "Large Option".to_string(),
            public: false,
            publicly_queryable: false,
            exclude_from_search: true,
            show_ui: false,
            can_export: true,
            delete_with_user: false,
        }
    }
}

/// A document as persisted in the `documents` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub kind: String,
    pub name: String,
    pub title: String,
    pub body: String,
}

/// Arguments for creating a document
#[derive(Clone, Debug)]
pub struct NewDocument<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub title: &'a str,
    pub body: Option<String>,
}

impl<'a> NewDocument<'a> {
    /// A document whose name doubles as its title
    pub const fn named(kind: &'a str, name: &'a str) -> Self {
        Self {
            kind,
            name,
            title: name,
            body: None,
        }
    }

    /// Set the initial body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Listing entry returned by [`crate::DocumentStore::list`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub title: String,
    pub body_len: usize,
}

/// Per-call switches for body writes.
///
/// Options apply to the single call they are passed to; nothing is left
/// toggled on the store afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Accept an empty body (rejected with `EmptyContent` otherwise)
    pub allow_empty: bool,
    /// Do not run the store's insert filters over the body
    pub skip_insert_filters: bool,
}

impl WriteOptions {
    /// Write the body exactly as given, empty or not.
    pub const fn raw() -> Self {
        Self {
            allow_empty: true,
            skip_insert_filters: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_option_kind_is_hidden() {
        let kind = DocumentKind::large_option("large_option");
        assert!(!kind.public);
        assert!(!kind.publicly_queryable);
        assert!(!kind.show_ui);
        assert!(kind.can_export);
        assert_eq!(kind.singular_label, "Large Option");
    }

    #[test]
    fn test_new_document_builder() {
        let doc = NewDocument::named("large_option", "banner").with_body("{}");
        assert_eq!(doc.title, "banner");
        assert_eq!(doc.body.as_deref(), Some("{}"));
    }
}
