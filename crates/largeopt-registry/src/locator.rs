//! Canonical key to document id resolution
//!
//! Lookups go through an in-process map (which also remembers misses),
//! then the shared cache, then a name query against the document store.

use crate::sanitize::CanonicalKey;
use largeopt_common::DocumentId;
use largeopt_store::{DocumentStore, SharedCache};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Shared cache key prefix for resolved ids
pub const CACHE_KEY_PREFIX: &str = "option-id:";

/// Resolution counters
#[derive(Debug, Default)]
pub struct LocatorStats {
    /// Resolutions answered by the in-process map
    pub map_hits: AtomicU64,
    /// Resolutions answered by the shared cache
    pub cache_hits: AtomicU64,
    /// Name queries sent to the document store
    pub store_queries: AtomicU64,
}

pub struct DocumentLocator {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn SharedCache>,
    kind: String,
    /// `None` records a confirmed miss
    resolved: RwLock<HashMap<CanonicalKey, Option<DocumentId>>>,
    stats: LocatorStats,
}

fn cache_key(key: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{key}")
}

impl DocumentLocator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn SharedCache>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            kind: kind.into(),
            resolved: RwLock::new(HashMap::new()),
            stats: LocatorStats::default(),
        }
    }

    pub fn resolve(&self, key: &CanonicalKey) -> Option<DocumentId> {
        if let Some(hit) = self.resolved.read().get(key) {
            self.stats.map_hits.fetch_add(1, Ordering::Relaxed);
            return *hit;
        }

        let cache_key = cache_key(key);
        if let Some(raw) = self.cache.get(&cache_key) {
            match raw.parse::<DocumentId>() {
                Ok(id) => {
                    debug!("Shared cache hit for {}: {}", key, id);
                    self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                    self.resolved.write().insert(key.clone(), Some(id));
                    return Some(id);
                }
                Err(_) => {
                    warn!("Dropping malformed cached id for {}: {:?}", key, raw);
                    self.cache.delete(&cache_key);
                }
            }
        }

        self.stats.store_queries.fetch_add(1, Ordering::Relaxed);
        let ids = match self.store.find_by_name(&self.kind, key) {
            Ok(ids) => ids,
            Err(e) => {
                // Not cached: the next call retries the query
                warn!("Failed to look up option {}: {}", key, e);
                return None;
            }
        };

        let found = match ids.as_slice() {
            [id] => Some(*id),
            [] => None,
            _ => {
                warn!(
                    "Option {} is backed by {} documents, treating as missing",
                    key,
                    ids.len()
                );
                None
            }
        };

        debug!("Resolved {} from store: {:?}", key, found);
        if let Some(id) = found {
            self.cache.set(&cache_key, id.to_string());
        }
        self.resolved.write().insert(key.clone(), found);
        found
    }

    /// Record the id of a freshly created document
    pub fn associate(&self, key: &CanonicalKey, id: DocumentId) {
        self.cache.set(&cache_key(key), id.to_string());
        self.resolved.write().insert(key.clone(), Some(id));
    }

    /// Forget everything known about `key`
    pub fn invalidate(&self, key: &CanonicalKey) {
        self.cache.delete(&cache_key(key));
        self.resolved.write().remove(key);
    }

    /// In-process resolution state: `None` if unresolved, `Some(None)` for a
    /// remembered miss.
    pub fn cached(&self, key: &CanonicalKey) -> Option<Option<DocumentId>> {
        self.resolved.read().get(key).copied()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn stats(&self) -> &LocatorStats {
        &self.stats
    }
}
