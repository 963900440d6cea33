//! Host configuration store, consulted only on the fallback path

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// The host platform's native (size-limited) configuration store
pub trait HostConfig: Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;

    /// While the host is installing, every read yields nothing
    fn is_bootstrapping(&self) -> bool {
        false
    }
}

/// Host with an empty configuration store
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostConfig;

impl HostConfig for NoHostConfig {
    fn get(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// In-memory host configuration store
#[derive(Debug, Default)]
pub struct MapHostConfig {
    values: RwLock<HashMap<String, Value>>,
    bootstrapping: AtomicBool,
}

impl MapHostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.write().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.values.write().remove(name)
    }

    pub fn set_bootstrapping(&self, bootstrapping: bool) {
        self.bootstrapping.store(bootstrapping, Ordering::SeqCst);
    }
}

impl HostConfig for MapHostConfig {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    fn is_bootstrapping(&self) -> bool {
        self.bootstrapping.load(Ordering::SeqCst)
    }
}
