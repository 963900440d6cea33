//! Registry behaviour against both document store backends

use largeopt_common::{DocumentId, StorageStrategy};
use largeopt_registry::{
    EventKind, LargeOptionRegistry, MapHostConfig, OptionEvent, Scope, VALUE_FIELD,
};
use largeopt_store::{
    AttachedFields, DocumentDb, DocumentKind, DocumentStore, DocumentSummary, MemoryCache,
    MemoryDocumentStore, NewDocument, StoreError, StoreResult, WriteOptions,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

const STRATEGIES: [StorageStrategy; 2] = [StorageStrategy::Embedded, StorageStrategy::Attached];

fn build<S>(store: Arc<S>, strategy: StorageStrategy) -> LargeOptionRegistry
where
    S: DocumentStore + AttachedFields + 'static,
{
    LargeOptionRegistry::builder(store)
        .with_cache(Arc::new(MemoryCache::new(128)))
        .with_default_strategy(strategy)
        .build()
        .unwrap()
}

fn redb_store() -> (TempDir, Arc<DocumentDb>) {
    let dir = tempfile::tempdir().unwrap();
    let db = DocumentDb::open(dir.path().join("options.redb")).unwrap();
    (dir, Arc::new(db))
}

fn nested() -> Value {
    json!({
        "title": "Spring sale",
        "slides": [
            { "image": "a.png", "alt": "Ünïcode <b>tags</b>" },
            { "image": "b.png", "weights": [0.5, 1, -3] }
        ],
        "enabled": true,
        "meta": { "nested": { "deep": [[1], [2, [3]]] }, "none": null }
    })
}

fn store_queries(registry: &LargeOptionRegistry) -> u64 {
    registry.locator().stats().store_queries.load(Ordering::Relaxed)
}

fn check_duplicate_add(registry: &LargeOptionRegistry) {
    assert!(registry.add("theme", json!({ "color": "red" }), true));
    assert!(!registry.add("theme", json!({ "color": "blue" }), true));
    assert!(!registry.add(" Theme ", json!({ "color": "blue" }), true));
    assert_eq!(registry.get("theme"), Some(json!({ "color": "red" })));
}

fn check_round_trip(registry: &LargeOptionRegistry) {
    assert!(registry.add("Home Page Slides", nested(), true));
    assert_eq!(registry.get("home-page-slides"), Some(nested()));
}

fn check_update_same_value(registry: &LargeOptionRegistry) {
    assert!(registry.add("counter", json!(41), true));
    assert!(!registry.update("counter", json!(41)));
    assert!(registry.update("counter", json!(42)));
    assert!(!registry.update("counter", json!(42)));
    assert_eq!(registry.get("counter"), Some(json!(42)));
}

fn check_update_to_falsy_deletes(registry: &LargeOptionRegistry, store: &dyn DocumentStore) {
    for falsy in [json!(null), json!(""), json!("0"), json!([]), json!(false)] {
        assert!(registry.add("ephemeral", json!(["x"]), true));
        assert_eq!(store.list(registry.kind()).unwrap().len(), 1);

        assert!(registry.update("ephemeral", falsy));
        assert!(registry.get("ephemeral").is_none());
        assert!(store.list(registry.kind()).unwrap().is_empty());
    }
}

fn check_scenario(registry: &LargeOptionRegistry) {
    assert!(registry.add("site_banner", json!({ "text": "Hello", "color": "blue" }), true));
    assert_eq!(
        registry.get("site_banner"),
        Some(json!({ "text": "Hello", "color": "blue" }))
    );
    assert!(registry.update("site_banner", json!({ "text": "Hi", "color": "blue" })));
    assert_eq!(
        registry.get("site_banner"),
        Some(json!({ "text": "Hi", "color": "blue" }))
    );
    assert!(registry.delete("site_banner"));
    assert_eq!(registry.get_or("site_banner", json!("gone")), json!("gone"));
    assert!(!registry.delete("site_banner"));
}

fn run_all<S, F>(make: F)
where
    S: DocumentStore + AttachedFields + 'static,
    F: Fn() -> Arc<S>,
{
    for strategy in STRATEGIES {
        check_duplicate_add(&build(make(), strategy));
        check_round_trip(&build(make(), strategy));
        check_update_same_value(&build(make(), strategy));

        let store = make();
        check_update_to_falsy_deletes(&build(store.clone(), strategy), store.as_ref());

        check_scenario(&build(make(), strategy));
    }
}

#[test]
fn test_memory_backend() {
    run_all(|| Arc::new(MemoryDocumentStore::new()));
}

#[test]
fn test_redb_backend() {
    let dirs = Mutex::new(Vec::new());
    run_all(|| {
        let (dir, store) = redb_store();
        dirs.lock().push(dir);
        store
    });
}

#[test]
fn test_get_after_add_skips_store_query() {
    for strategy in STRATEGIES {
        let store = Arc::new(MemoryDocumentStore::new());
        let registry = build(store.clone(), strategy);

        assert!(registry.add("cached", json!([1, 2, 3]), true));
        let queries = store.name_queries();
        let reads = store.stats().body_reads.load(Ordering::Relaxed);

        assert_eq!(registry.get("cached"), Some(json!([1, 2, 3])));
        assert_eq!(registry.get("Cached"), Some(json!([1, 2, 3])));
        assert_eq!(store.name_queries(), queries);
        assert_eq!(store.stats().body_reads.load(Ordering::Relaxed), reads);

        assert!(registry.delete("cached"));
        let key = registry.key("cached").unwrap();
        assert_eq!(registry.locator().cached(&key), None);
        assert!(registry.get("cached").is_none());
        assert_eq!(store.name_queries(), queries + 1);
    }
}

#[test]
fn test_second_registry_resolves_through_shared_cache() {
    let (_dir, store) = redb_store();
    let cache = Arc::new(MemoryCache::new(16));

    let writer = LargeOptionRegistry::builder(store.clone())
        .with_cache(cache.clone())
        .build()
        .unwrap();
    assert!(writer.add("shared", json!({ "v": 1 }), true));

    let reader = LargeOptionRegistry::builder(store)
        .with_cache(cache.clone())
        .build()
        .unwrap();
    assert_eq!(reader.get("shared"), Some(json!({ "v": 1 })));
    assert_eq!(store_queries(&reader), 0);
    assert_eq!(reader.locator().stats().cache_hits.load(Ordering::Relaxed), 1);
    assert!(cache.stats().hits.load(Ordering::Relaxed) >= 1);
}

#[test]
fn test_fallback_after_delete() {
    let store = Arc::new(MemoryDocumentStore::new());
    let host = Arc::new(MapHostConfig::new());
    host.set("motd", json!("from host"));

    let strict = LargeOptionRegistry::builder(store.clone())
        .with_host_config(host.clone())
        .build()
        .unwrap();
    assert!(strict.add("motd", json!("stored"), true));
    assert!(strict.delete("motd"));
    assert_eq!(strict.get_or("motd", json!("D")), json!("D"));

    let lenient = LargeOptionRegistry::builder(store)
        .with_host_config(host.clone())
        .with_fallback_to_host_config(true)
        .build()
        .unwrap();
    assert_eq!(lenient.get_or("motd", json!("D")), json!("from host"));
    assert_eq!(lenient.get_or("unknown", json!("D")), json!("D"));

    // Falsy host values count as missing
    host.set("blank", json!(""));
    assert_eq!(lenient.get_or("blank", json!("D")), json!("D"));
}

#[test]
fn test_fallback_filter_overrides_config() {
    let store = Arc::new(MemoryDocumentStore::new());
    let host = Arc::new(MapHostConfig::new());
    host.set("legacy", json!(7));
    host.set("other", json!(8));

    let registry = LargeOptionRegistry::builder(store)
        .with_host_config(host)
        .build()
        .unwrap();
    registry.hooks().on_fallback(|fallback, key| fallback || key == "legacy");

    assert_eq!(registry.get("legacy"), Some(json!(7)));
    assert!(registry.get("other").is_none());
}

#[test]
fn test_attached_values_live_in_field() {
    let (_dir, store) = redb_store();
    let registry = build(store.clone(), StorageStrategy::Attached);

    assert!(registry.add("big", nested(), true));
    let docs = store.list(registry.kind()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "big");
    assert_eq!(docs[0].title, "big");
    assert_eq!(docs[0].body_len, 0);
    assert_eq!(store.field(docs[0].id, VALUE_FIELD).unwrap(), Some(nested()));

    assert!(registry.delete("big"));
    assert!(store.field(docs[0].id, VALUE_FIELD).unwrap().is_none());
}

#[test]
fn test_embedded_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.redb");

    {
        let store = Arc::new(DocumentDb::open(&path).unwrap());
        let registry = build(store, StorageStrategy::Embedded);
        assert!(registry.add("persisted", nested(), true));
    }

    let store = Arc::new(DocumentDb::open(&path).unwrap());
    let registry = build(store, StorageStrategy::Embedded);
    assert_eq!(registry.get("persisted"), Some(nested()));
}

#[test]
fn test_embedded_write_bypasses_insert_filters() {
    let store = Arc::new(MemoryDocumentStore::new());
    store
        .insert_filters()
        .add(Arc::new(|_: &str, body: String| body.replace("script", "")));
    let registry = build(store.clone(), StorageStrategy::Embedded);

    assert!(registry.add("snippet", json!({ "html": "<script>a()</script>" }), true));
    assert!(registry.update("snippet", json!({ "html": "<script>b()</script>" })));

    let id = registry.locator().resolve(&registry.key("snippet").unwrap()).unwrap();
    assert_eq!(
        store.body(id).unwrap().as_deref(),
        Some(r#"{"html":"<script>b()</script>"}"#)
    );

    // A registry without cached state decodes the same body
    let fresh = build(store, StorageStrategy::Embedded);
    assert_eq!(
        fresh.get("snippet"),
        Some(json!({ "html": "<script>b()</script>" }))
    );
}

#[test]
fn test_redb_rejects_second_document_for_key() {
    let (_dir, store) = redb_store();
    let first = build(store.clone(), StorageStrategy::Embedded);
    let second = build(store.clone(), StorageStrategy::Embedded);

    // `second` caches the miss before `first` creates the document
    assert!(second.get("race").is_none());
    assert!(first.add("race", json!(1), true));
    assert!(!second.add("race", json!(2), true));
    assert_eq!(store.list(first.kind()).unwrap().len(), 1);
    assert_eq!(first.get("race"), Some(json!(1)));
}

/// Memory store whose attached-field writes always fail
struct ReadOnlyFields(MemoryDocumentStore);

impl DocumentStore for ReadOnlyFields {
    fn register_kind(&self, kind: &DocumentKind) -> StoreResult<()> {
        self.0.register_kind(kind)
    }

    fn create_document(
        &self,
        doc: &NewDocument<'_>,
        opts: WriteOptions,
    ) -> StoreResult<DocumentId> {
        self.0.create_document(doc, opts)
    }

    fn update_body(&self, id: DocumentId, body: &str, opts: WriteOptions) -> StoreResult<()> {
        self.0.update_body(id, body, opts)
    }

    fn delete_document(&self, id: DocumentId) -> StoreResult<bool> {
        self.0.delete_document(id)
    }

    fn find_by_name(&self, kind: &str, name: &str) -> StoreResult<Vec<DocumentId>> {
        self.0.find_by_name(kind, name)
    }

    fn body(&self, id: DocumentId) -> StoreResult<Option<String>> {
        self.0.body(id)
    }

    fn list(&self, kind: &str) -> StoreResult<Vec<DocumentSummary>> {
        self.0.list(kind)
    }
}

impl AttachedFields for ReadOnlyFields {
    fn field(&self, id: DocumentId, key: &str) -> StoreResult<Option<Value>> {
        self.0.field(id, key)
    }

    fn set_field(&self, _id: DocumentId, _key: &str, _value: &Value) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other("fields are read-only")))
    }

    fn delete_field(&self, id: DocumentId, key: &str) -> StoreResult<bool> {
        self.0.delete_field(id, key)
    }
}

#[test]
fn test_failed_attached_write_rolls_back() {
    let store = Arc::new(ReadOnlyFields(MemoryDocumentStore::new()));
    let registry = build(store.clone(), StorageStrategy::Attached);

    assert!(!registry.add("big", nested(), true));
    assert!(store.0.is_empty());
    assert!(!registry.is_cached("big"));
    assert!(registry.get("big").is_none());

    // Embedded writes never touch the field store
    let embedded = build(store.clone(), StorageStrategy::Embedded);
    assert!(embedded.add("small", json!("ok"), true));
    assert_eq!(store.0.len(), 1);
}

#[test]
fn test_listeners_per_key_and_generic() {
    let store = Arc::new(MemoryDocumentStore::new());
    let registry = build(store, StorageStrategy::Embedded);
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    registry
        .hooks()
        .subscribe(EventKind::Deleted, Scope::All, move |e| {
            l.lock().push(format!("all:{}", e.key()));
        });
    let l = log.clone();
    registry
        .hooks()
        .subscribe(EventKind::Deleted, Scope::key("site_banner"), move |e| {
            if let OptionEvent::Deleted { old, .. } = e {
                l.lock().push(format!("banner:{}", old.is_some()));
            }
        });

    registry.add("site_banner", json!("x"), true);
    registry.add("other", json!("y"), true);
    registry.delete("site_banner");
    registry.delete("other");

    assert_eq!(*log.lock(), vec!["banner:true", "all:site_banner", "all:other"]);
}

#[test]
fn test_add_during_bootstrap_keeps_stored_value() {
    for strategy in STRATEGIES {
        let (_dir, store) = redb_store();
        let host = Arc::new(MapHostConfig::new());
        let registry = LargeOptionRegistry::builder(store.clone())
            .with_host_config(host.clone())
            .with_default_strategy(strategy)
            .build()
            .unwrap();

        assert!(registry.add("k", json!("v1"), true));
        host.set_bootstrapping(true);
        assert_eq!(registry.get_or("k", json!("D")), json!(false));
        assert!(!registry.add("k", json!("v2"), true));
        assert!(!registry.add("k", json!("v2"), false));
        host.set_bootstrapping(false);

        let fresh = build(store.clone(), strategy);
        assert_eq!(fresh.get("k"), Some(json!("v1")));
        assert_eq!(store.list(registry.kind()).unwrap().len(), 1);
    }
}

#[test]
fn test_pre_get_can_force_falsy_value() {
    let store = Arc::new(MemoryDocumentStore::new());
    let registry = build(store.clone(), StorageStrategy::Embedded);
    registry.hooks().on_pre_get("k", |_| Some(json!(0)));

    assert_eq!(registry.get("k"), Some(json!(0)));
    assert_eq!(registry.get_or("k", json!("D")), json!(0));
    assert_eq!(store.name_queries(), 0);
}

#[test]
fn test_update_missing_with_falsy_value_adds_document() {
    for strategy in STRATEGIES {
        let (_dir, store) = redb_store();
        let registry = build(store.clone(), strategy);

        assert!(registry.update("blank", json!("")));
        assert_eq!(store.list(registry.kind()).unwrap().len(), 1);
        assert!(registry.get("blank").is_none());

        assert!(registry.update("blank", json!("filled")));
        assert_eq!(registry.get("blank"), Some(json!("filled")));
        assert_eq!(store.list(registry.kind()).unwrap().len(), 1);
    }
}
