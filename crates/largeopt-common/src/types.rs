//! Core types for LargeOpt

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a document in the backing document store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Where an option's value physically lives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStrategy {
    /// Serialized into the document body
    #[default]
    Embedded,
    /// Stored as a field attached to the document
    Attached,
}

impl StorageStrategy {
    /// Strategy for a `use_embedded` policy decision
    #[must_use]
    pub const fn from_embedded(embedded: bool) -> Self {
        if embedded { Self::Embedded } else { Self::Attached }
    }

    #[must_use]
    pub const fn is_embedded(self) -> bool {
        matches!(self, Self::Embedded)
    }
}

/// Whether a value counts as "set".
///
/// `null`, `false`, zero, `""`, `"0"`, `[]` and `{}` are falsy. Updating an
/// option to a falsy value removes it.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
