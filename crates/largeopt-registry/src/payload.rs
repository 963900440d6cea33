//! Value payload storage against a resolved document
//!
//! Embedded values live in the document body as JSON text; attached values
//! live in the [`VALUE_FIELD`] field. The strategy is decided per call and
//! must agree between the write and the read of a key.

use crate::hooks::Hooks;
use largeopt_common::{DocumentId, StorageStrategy, is_truthy};
use largeopt_store::{AttachedFields, DocumentStore, StoreResult, WriteOptions};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Attached field holding the value
pub const VALUE_FIELD: &str = "large-option-value";

/// Serialized body for an embedded value. Falsy values become an empty body.
pub fn encode_body(value: &Value) -> String {
    if is_truthy(value) {
        value.to_string()
    } else {
        String::new()
    }
}

pub struct ValuePayloadStore {
    documents: Arc<dyn DocumentStore>,
    fields: Arc<dyn AttachedFields>,
    hooks: Arc<Hooks>,
    default_strategy: StorageStrategy,
}

impl ValuePayloadStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        fields: Arc<dyn AttachedFields>,
        hooks: Arc<Hooks>,
        default_strategy: StorageStrategy,
    ) -> Self {
        Self {
            documents,
            fields,
            hooks,
            default_strategy,
        }
    }

    /// Strategy for `key`, after the `use_embedded` filters
    pub fn strategy(&self, key: &str, id: Option<DocumentId>) -> StorageStrategy {
        StorageStrategy::from_embedded(self.hooks.use_embedded(
            self.default_strategy.is_embedded(),
            key,
            id,
        ))
    }

    pub fn write(&self, id: DocumentId, key: &str, value: &Value) -> bool {
        self.write_as(self.strategy(key, Some(id)), id, key, value)
    }

    pub fn read(&self, id: DocumentId, key: &str) -> Option<Value> {
        self.read_as(self.strategy(key, Some(id)), id, key)
    }

    pub fn write_as(
        &self,
        strategy: StorageStrategy,
        id: DocumentId,
        key: &str,
        value: &Value,
    ) -> bool {
        let result: StoreResult<()> = match strategy {
            StorageStrategy::Embedded => {
                self.documents
                    .update_body(id, &encode_body(value), WriteOptions::raw())
            }
            StorageStrategy::Attached => self.fields.set_field(id, VALUE_FIELD, value),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write option {} to document {}: {}", key, id, e);
                false
            }
        }
    }

    pub fn read_as(&self, strategy: StorageStrategy, id: DocumentId, key: &str) -> Option<Value> {
        match strategy {
            StorageStrategy::Embedded => {
                let body = match self.documents.body(id) {
                    Ok(body) => body?,
                    Err(e) => {
                        warn!("Failed to read option {} from document {}: {}", key, id, e);
                        return None;
                    }
                };
                if body.is_empty() {
                    return None;
                }
                match serde_json::from_str(&body) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Undecodable body for option {} in document {}: {}", key, id, e);
                        None
                    }
                }
            }
            StorageStrategy::Attached => match self.fields.field(id, VALUE_FIELD) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Failed to read field of option {} on document {}: {}", key, id, e);
                    None
                }
            },
        }
    }
}
