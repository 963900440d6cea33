//! LargeOpt Common - Shared types and utilities
//!
//! This crate provides the types, error definitions and configuration
//! shared by the document store, the option registry and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
