//! Error types for LargeOpt
//!
//! Errors that can surface outside the option registry: configuration
//! loading and value (de)serialization. The registry itself never returns
//! these to callers; it degrades them to `false` or an absent value.

use thiserror::Error;

/// Common result type for LargeOpt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for LargeOpt
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Configuration(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Self::Deserialization(e.to_string())
        } else {
            Self::Serialization(e.to_string())
        }
    }
}
