//! Large option registry
//!
//! [`LargeOptionRegistry`] is the façade callers use to add, update, delete
//! and read options. Every operation sanitizes the raw name first. Storage
//! failures never surface as errors: mutations return `false`, reads return
//! `None`, and the failure is logged.

use crate::hooks::{Hooks, OptionEvent};
use crate::host::{HostConfig, NoHostConfig};
use crate::locator::DocumentLocator;
use crate::payload::{ValuePayloadStore, encode_body};
use crate::sanitize::{CanonicalKey, DashSlugger, NameSanitizer, Slugger};
use largeopt_common::config::RegistryConfig;
use largeopt_common::{DocumentId, StorageStrategy, is_truthy};
use largeopt_store::{
    AttachedFields, DocumentKind, DocumentStore, DocumentSummary, NewDocument, NoopCache,
    SharedCache, StoreResult, WriteOptions,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Document kind used when none is configured
pub const DEFAULT_KIND: &str = "large_option";

/// Outcome of a read
enum Lookup {
    Found(Value),
    /// The host is installing; reads yield `false`
    Bootstrapping,
    Missing,
}

impl Lookup {
    fn into_value(self) -> Option<Value> {
        match self {
            Self::Found(value) => Some(value),
            Self::Bootstrapping | Self::Missing => None,
        }
    }
}

/// Builder for [`LargeOptionRegistry`]
pub struct RegistryBuilder<S> {
    store: Arc<S>,
    cache: Arc<dyn SharedCache>,
    host: Arc<dyn HostConfig>,
    hooks: Arc<Hooks>,
    slugger: Arc<dyn Slugger>,
    kind: String,
    default_strategy: StorageStrategy,
    fallback_to_host_config: bool,
}

impl<S> RegistryBuilder<S>
where
    S: DocumentStore + AttachedFields + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Arc::new(NoopCache),
            host: Arc::new(NoHostConfig),
            hooks: Arc::new(Hooks::new()),
            slugger: Arc::new(DashSlugger),
            kind: DEFAULT_KIND.to_string(),
            default_strategy: StorageStrategy::default(),
            fallback_to_host_config: false,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SharedCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_host_config(mut self, host: Arc<dyn HostConfig>) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_slugger(mut self, slugger: Arc<dyn Slugger>) -> Self {
        self.slugger = slugger;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_default_strategy(mut self, strategy: StorageStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_fallback_to_host_config(mut self, fallback: bool) -> Self {
        self.fallback_to_host_config = fallback;
        self
    }

    /// Apply the `[registry]` configuration section
    #[must_use]
    pub fn with_config(self, config: &RegistryConfig) -> Self {
        self.with_kind(config.kind.clone())
            .with_default_strategy(config.default_strategy)
            .with_fallback_to_host_config(config.fallback_to_host_config)
    }

    /// Register the document kind and assemble the registry
    pub fn build(self) -> StoreResult<LargeOptionRegistry> {
        self.store
            .register_kind(&DocumentKind::large_option(self.kind.clone()))?;

        let documents: Arc<dyn DocumentStore> = self.store.clone();
        let fields: Arc<dyn AttachedFields> = self.store;

        info!(
            "Large option registry ready: kind={}, strategy={:?}, fallback={}",
            self.kind, self.default_strategy, self.fallback_to_host_config
        );

        Ok(LargeOptionRegistry {
            sanitizer: NameSanitizer::new(self.slugger),
            locator: DocumentLocator::new(documents.clone(), self.cache, self.kind.clone()),
            payload: ValuePayloadStore::new(
                documents.clone(),
                fields,
                self.hooks.clone(),
                self.default_strategy,
            ),
            store: documents,
            host: self.host,
            hooks: self.hooks,
            values: RwLock::new(HashMap::new()),
            kind: self.kind,
            fallback_to_host_config: self.fallback_to_host_config,
        })
    }
}

/// Keyed store for values too large for the host configuration store
pub struct LargeOptionRegistry {
    sanitizer: NameSanitizer,
    locator: DocumentLocator,
    payload: ValuePayloadStore,
    store: Arc<dyn DocumentStore>,
    host: Arc<dyn HostConfig>,
    hooks: Arc<Hooks>,
    /// Truthy values read or written through this registry
    values: RwLock<HashMap<CanonicalKey, Value>>,
    kind: String,
    fallback_to_host_config: bool,
}

impl LargeOptionRegistry {
    pub fn builder<S>(store: Arc<S>) -> RegistryBuilder<S>
    where
        S: DocumentStore + AttachedFields + 'static,
    {
        RegistryBuilder::new(store)
    }

    /// Store a new option.
    ///
    /// With `check_exists`, refuses when `get` already yields a value.
    pub fn add(&self, name: &str, value: Value, check_exists: bool) -> bool {
        let Some(key) = self.sanitizer.sanitize(name) else {
            return false;
        };
        self.add_key(&key, value, check_exists)
    }

    /// Change an option's value.
    ///
    /// Missing options are added (even with a falsy value), falsy values
    /// delete an existing option, and an unchanged value is a no-op
    /// returning `false`.
    pub fn update(&self, name: &str, value: Value) -> bool {
        let Some(key) = self.sanitizer.sanitize(name) else {
            return false;
        };

        let old = self.get_key(&key);
        let new = self.hooks.pre_update(value, &key, old.as_ref());
        if old.as_ref() == Some(&new) {
            debug!("Option {} unchanged", key);
            return false;
        }

        let Some(old) = old else {
            return self.add_key(&key, new, false);
        };

        if !is_truthy(&new) {
            return self.delete_key(&key);
        }

        // Old value came from a pre-get filter or the host config
        let Some(id) = self.locator.resolve(&key) else {
            return self.add_key(&key, new, false);
        };

        if !self.payload.write(id, &key, &new) {
            return false;
        }

        self.values.write().insert(key.clone(), new.clone());
        debug!("Updated option {} in document {}", key, id);
        self.hooks.emit(&OptionEvent::Updated {
            key: key.to_string(),
            old,
            new,
        });
        true
    }

    /// Remove an option together with its backing document
    pub fn delete(&self, name: &str) -> bool {
        let Some(key) = self.sanitizer.sanitize(name) else {
            return false;
        };
        self.delete_key(&key)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let key = self.sanitizer.sanitize(name)?;
        self.get_key(&key)
    }

    /// Value of `name`, or `default` when missing.
    ///
    /// While the host is bootstrapping this is `false` regardless of
    /// `default`.
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        let Some(key) = self.sanitizer.sanitize(name) else {
            return default;
        };
        match self.lookup(&key) {
            Lookup::Found(value) => value,
            Lookup::Bootstrapping => Value::Bool(false),
            Lookup::Missing => default,
        }
    }

    /// Canonical key for a raw name
    pub fn key(&self, name: &str) -> Option<CanonicalKey> {
        self.sanitizer.sanitize(name)
    }

    /// Whether the value of `name` is held in-process
    pub fn is_cached(&self, name: &str) -> bool {
        self.sanitizer
            .sanitize(name)
            .is_some_and(|key| self.values.read().contains_key(&key))
    }

    /// Backing documents of this registry's kind
    pub fn list(&self) -> StoreResult<Vec<DocumentSummary>> {
        self.store.list(&self.kind)
    }

    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    pub fn locator(&self) -> &DocumentLocator {
        &self.locator
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    fn add_key(&self, key: &CanonicalKey, value: Value, check_exists: bool) -> bool {
        if check_exists && self.get_key(key).is_some() {
            debug!("Option {} already exists", key);
            return false;
        }

        // A document with an unreadable payload is reused, not duplicated
        if let Some(id) = self.locator.resolve(key) {
            if self.stored_value(key, id).is_some() {
                debug!("Option {} already stored in document {}", key, id);
                return false;
            }
            if !self.payload.write(id, key, &value) {
                return false;
            }
            return self.finish_add(key, id, value);
        }

        let strategy = self.payload.strategy(key, None);
        let mut doc = NewDocument::named(&self.kind, key);
        if strategy.is_embedded() {
            doc = doc.with_body(encode_body(&value));
        }

        let id = match self.store.create_document(&doc, WriteOptions::raw()) {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to create document for option {}: {}", key, e);
                return false;
            }
        };

        if !strategy.is_embedded() && !self.payload.write_as(strategy, id, key, &value) {
            if let Err(e) = self.store.delete_document(id) {
                warn!("Failed to roll back document {} for option {}: {}", id, key, e);
            }
            return false;
        }

        self.finish_add(key, id, value)
    }

    fn finish_add(&self, key: &CanonicalKey, id: DocumentId, value: Value) -> bool {
        self.locator.associate(key, id);
        if is_truthy(&value) {
            self.values.write().insert(key.clone(), value.clone());
        }
        info!("Added option {} as document {}", key, id);
        self.hooks.emit(&OptionEvent::Added {
            key: key.to_string(),
            value,
        });
        true
    }

    fn delete_key(&self, key: &CanonicalKey) -> bool {
        let Some(id) = self.locator.resolve(key) else {
            return false;
        };

        let cached = self.values.read().get(key).cloned();
        let old = cached.or_else(|| self.payload.read(id, key));

        match self.store.delete_document(id) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Document {} for option {} already gone", id, key);
                self.forget(key);
                return false;
            }
            Err(e) => {
                warn!("Failed to delete document {} for option {}: {}", id, key, e);
                return false;
            }
        }

        self.forget(key);
        info!("Deleted option {} (document {})", key, id);
        self.hooks.emit(&OptionEvent::Deleted {
            key: key.to_string(),
            old,
        });
        true
    }

    fn forget(&self, key: &CanonicalKey) {
        self.values.write().remove(key);
        self.locator.invalidate(key);
    }

    fn get_key(&self, key: &CanonicalKey) -> Option<Value> {
        self.lookup(key).into_value()
    }

    fn lookup(&self, key: &CanonicalKey) -> Lookup {
        if let Some(value) = self.hooks.pre_get(key) {
            return Lookup::Found(value);
        }

        if self.host.is_bootstrapping() {
            return Lookup::Bootstrapping;
        }

        if let Some(value) = self.values.read().get(key) {
            debug!("Value cache hit for {}", key);
            return Lookup::Found(value.clone());
        }

        let Some(id) = self.locator.resolve(key) else {
            if self.hooks.fallback(self.fallback_to_host_config, key) {
                return self
                    .host
                    .get(key)
                    .filter(is_truthy)
                    .map_or(Lookup::Missing, Lookup::Found);
            }
            return Lookup::Missing;
        };

        self.stored_value(key, id).map_or(Lookup::Missing, Lookup::Found)
    }

    /// Truthy payload of the document backing `key`, bypassing filters and
    /// the bootstrap guard
    fn stored_value(&self, key: &CanonicalKey, id: DocumentId) -> Option<Value> {
        if let Some(value) = self.values.read().get(key) {
            return Some(value.clone());
        }

        let value = self.payload.read(id, key).filter(is_truthy)?;
        self.values.write().insert(key.clone(), value.clone());
        Some(value)
    }
}
