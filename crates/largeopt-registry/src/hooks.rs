//! Typed interception points
//!
//! Filters transform a value on its way through the registry; listeners
//! observe completed mutations. Filters and listeners run in registration
//! order. Callback lists are cloned out of their lock before invocation, so
//! a callback may register further hooks or call back into the registry.

use largeopt_common::DocumentId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type PreGetFilter = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
pub type PreUpdateFilter = Arc<dyn Fn(Value, &str, Option<&Value>) -> Value + Send + Sync>;
pub type UseEmbeddedFilter = Arc<dyn Fn(bool, &str, Option<DocumentId>) -> bool + Send + Sync>;
pub type FallbackFilter = Arc<dyn Fn(bool, &str) -> bool + Send + Sync>;
pub type Listener = Arc<dyn Fn(&OptionEvent) + Send + Sync>;

/// Kind of completed mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Updated,
    Deleted,
}

/// Which keys a listener subscribes to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    All,
    Key(String),
}

impl Scope {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

/// Notification payload
#[derive(Clone, Debug, PartialEq)]
pub enum OptionEvent {
    Added {
        key: String,
        value: Value,
    },
    Updated {
        key: String,
        old: Value,
        new: Value,
    },
    Deleted {
        key: String,
        old: Option<Value>,
    },
}

impl OptionEvent {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Added { .. } => EventKind::Added,
            Self::Updated { .. } => EventKind::Updated,
            Self::Deleted { .. } => EventKind::Deleted,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Updated { key, .. } | Self::Deleted { key, .. } => key,
        }
    }
}

/// Hook dispatcher owned by a registry
#[derive(Default)]
pub struct Hooks {
    pre_get: RwLock<HashMap<String, Vec<PreGetFilter>>>,
    pre_update: RwLock<Vec<PreUpdateFilter>>,
    use_embedded: RwLock<Vec<UseEmbeddedFilter>>,
    fallback: RwLock<Vec<FallbackFilter>>,
    listeners: RwLock<HashMap<(EventKind, Scope), Vec<Listener>>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short-circuit reads of `key`. The first filter returning a value
    /// other than `false` wins, so `0` or `""` can be forced.
    pub fn on_pre_get<F>(&self, key: impl Into<String>, filter: F)
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.pre_get
            .write()
            .entry(key.into())
            .or_default()
            .push(Arc::new(filter));
    }

    /// Rewrite the value passed to `update`, given the key and the current value
    pub fn on_pre_update<F>(&self, filter: F)
    where
        F: Fn(Value, &str, Option<&Value>) -> Value + Send + Sync + 'static,
    {
        self.pre_update.write().push(Arc::new(filter));
    }

    /// Override the storage strategy decision
    pub fn on_use_embedded<F>(&self, filter: F)
    where
        F: Fn(bool, &str, Option<DocumentId>) -> bool + Send + Sync + 'static,
    {
        self.use_embedded.write().push(Arc::new(filter));
    }

    /// Override whether a missing option falls back to the host config
    pub fn on_fallback<F>(&self, filter: F)
    where
        F: Fn(bool, &str) -> bool + Send + Sync + 'static,
    {
        self.fallback.write().push(Arc::new(filter));
    }

    pub fn subscribe<F>(&self, kind: EventKind, scope: Scope, listener: F)
    where
        F: Fn(&OptionEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry((kind, scope))
            .or_default()
            .push(Arc::new(listener));
    }

    pub(crate) fn pre_get(&self, key: &str) -> Option<Value> {
        let filters = self.pre_get.read().get(key).cloned()?;
        filters
            .iter()
            .filter_map(|filter| filter(key))
            .find(|value| !matches!(value, Value::Bool(false)))
    }

    pub(crate) fn pre_update(&self, new: Value, key: &str, old: Option<&Value>) -> Value {
        let filters = self.pre_update.read().clone();
        filters
            .iter()
            .fold(new, |value, filter| filter(value, key, old))
    }

    pub(crate) fn use_embedded(&self, default: bool, key: &str, id: Option<DocumentId>) -> bool {
        let filters = self.use_embedded.read().clone();
        filters
            .iter()
            .fold(default, |embedded, filter| filter(embedded, key, id))
    }

    pub(crate) fn fallback(&self, default: bool, key: &str) -> bool {
        let filters = self.fallback.read().clone();
        filters
            .iter()
            .fold(default, |fallback, filter| filter(fallback, key))
    }

    /// Notify per-key listeners, then listeners for all keys
    pub(crate) fn emit(&self, event: &OptionEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = {
            let map = self.listeners.read();
            let keyed = map.get(&(kind, Scope::key(event.key())));
            let all = map.get(&(kind, Scope::All));
            keyed
                .into_iter()
                .chain(all)
                .flatten()
                .cloned()
                .collect()
        };

        for listener in &listeners {
            listener(event);
        }
    }
}
