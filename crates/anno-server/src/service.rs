//! Annotation lifecycle: create, get and delete within a collection.
//!
//! Every operation first checks that `{user}/{collection}` exists, then does
//! a single keyed operation on `{user}/{collection}/{annotationId}`. Store
//! failures are classified once, at the call site: the not-found tag turns
//! into a domain outcome, anything else becomes [`ApiError::Internal`].

use std::sync::Arc;

use anno_ldp::{expand_annotation, Container, LdpResource};
use anno_store::{KvStore, StoreError};
use anno_types::{AnnotationId, AnnotationKey, CollectionKey, IdGenerator, UuidV4Generator};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Result of a successful create.
#[derive(Debug)]
pub struct Created {
    /// Request path of the new annotation, `/{user}/{collection}/{id}`.
    pub location: String,
    pub id: AnnotationId,
    pub resource: LdpResource,
}

/// Request-scoped annotation operations over an injected store.
pub struct AnnotationService {
    store: Arc<dyn KvStore>,
    ids: Arc<dyn IdGenerator>,
}

impl AnnotationService {
    /// Service generating random UUID v4 identifiers.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_id_generator(store, Arc::new(UuidV4Generator))
    }

    pub fn with_id_generator(store: Arc<dyn KvStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Store `payload` as a new annotation with a freshly generated `id`.
    ///
    /// `None` and JSON `null` count as an absent payload. A client-supplied
    /// `id` is overwritten. The identifier is never regenerated: if the new
    /// key is already taken the request fails with `BadRequest`.
    pub fn create(
        &self,
        user: &str,
        collection: &str,
        payload: Option<Value>,
    ) -> ApiResult<Created> {
        let collection = self.require_collection(user, collection)?;
        self.insert_annotation(collection, payload)
    }

    /// Like [`create`](Self::create), for an unparsed request body.
    ///
    /// The collection is checked before the body is looked at, so a request
    /// against a missing collection is `CollectionNotFound` even when the
    /// body is not JSON. An empty body is an absent payload.
    pub fn create_from_body(
        &self,
        user: &str,
        collection: &str,
        body: &[u8],
    ) -> ApiResult<Created> {
        let collection = self.require_collection(user, collection)?;
        let payload = parse_payload(body)?;
        self.insert_annotation(collection, payload)
    }

    fn insert_annotation(
        &self,
        collection: CollectionKey,
        payload: Option<Value>,
    ) -> ApiResult<Created> {
        let mut annotation = match payload {
            None | Some(Value::Null) => {
                return Err(ApiError::BadRequest("missing annotation payload".into()))
            }
            Some(Value::Object(fields)) => fields,
            Some(_) => {
                return Err(ApiError::BadRequest(
                    "annotation payload must be a JSON object".into(),
                ))
            }
        };

        let key = collection.annotation(self.ids.generate());
        annotation.insert("id".into(), Value::String(key.id().to_string()));
        let bytes = serde_json::to_vec(&annotation).map_err(ApiError::internal)?;

        match self.store.insert_new(key.as_str(), &bytes) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { key }) => {
                return Err(ApiError::BadRequest(format!(
                    "generated identifier already in use: {key}"
                )))
            }
            Err(e) => return Err(ApiError::internal(e)),
        }
        tracing::debug!(key = %key, "annotation created");

        let container = Container::new(&collection);
        Ok(Created {
            location: key.path(),
            id: key.id().clone(),
            resource: LdpResource::new(expand_annotation(annotation, &container)),
        })
    }

    /// Read an annotation and shape it as an LDP resource.
    pub fn get(&self, user: &str, collection: &str, annotation: &str) -> ApiResult<LdpResource> {
        let collection = self.require_collection(user, collection)?;
        let key = annotation_key(&collection, annotation)?;

        let bytes = match self.store.get(key.as_str()) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(ApiError::AnnotationNotFound(key.to_string()))
            }
            Err(e) => return Err(ApiError::internal(e)),
        };
        let fields: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Internal(format!("undecodable annotation {key}: {e}")))?;

        let container = Container::new(&collection);
        Ok(LdpResource::new(expand_annotation(fields, &container)))
    }

    /// Remove an annotation. A second delete of the same key is `AnnotationNotFound`.
    pub fn delete(&self, user: &str, collection: &str, annotation: &str) -> ApiResult<()> {
        let collection = self.require_collection(user, collection)?;
        let key = annotation_key(&collection, annotation)?;

        match self.store.contains(key.as_str()) {
            Ok(true) => {}
            Ok(false) => return Err(ApiError::AnnotationNotFound(key.to_string())),
            Err(e) => return Err(ApiError::internal(e)),
        }
        match self.store.delete(key.as_str()) {
            Ok(()) => {
                tracing::debug!(key = %key, "annotation deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(ApiError::AnnotationNotFound(key.to_string())),
            Err(e) => Err(ApiError::internal(e)),
        }
    }

    fn require_collection(&self, user: &str, collection: &str) -> ApiResult<CollectionKey> {
        // A segment containing '/' could alias a deeper key; such a
        // collection cannot exist.
        let key = CollectionKey::new(user, collection)
            .map_err(|_| ApiError::CollectionNotFound(format!("{user}/{collection}")))?;
        match self.store.contains(key.as_str()) {
            Ok(true) => Ok(key),
            Ok(false) => Err(ApiError::CollectionNotFound(key.to_string())),
            Err(e) => Err(ApiError::internal(e)),
        }
    }
}

/// An empty body is an absent payload; anything else must be valid JSON.
fn parse_payload(body: &[u8]) -> ApiResult<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

fn annotation_key(collection: &CollectionKey, annotation: &str) -> ApiResult<AnnotationKey> {
    AnnotationId::parse(annotation)
        .map(|id| collection.annotation(id))
        .map_err(|_| ApiError::AnnotationNotFound(format!("{collection}/{annotation}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use anno_store::{InMemoryKvStore, StoreResult};
    use serde_json::json;

    /// Hands out the same identifier every time.
    struct FixedIds(&'static str);

    impl IdGenerator for FixedIds {
        fn generate(&self) -> AnnotationId {
            AnnotationId::parse(self.0).unwrap()
        }
    }

    /// In-memory store that can be told to fail, and counts writes.
    #[derive(Default)]
    struct FaultyStore {
        inner: InMemoryKvStore,
        fail_reads_of: std::sync::Mutex<Option<String>>,
        fail_writes: AtomicBool,
        fail_deletes: AtomicBool,
        writes: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl FaultyStore {
        fn fail_reads_of(&self, key: &str) {
            *self.fail_reads_of.lock().unwrap() = Some(key.to_string());
        }

        fn io_error() -> StoreError {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk unavailable"))
        }
    }

    impl KvStore for FaultyStore {
        fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
            if self.fail_reads_of.lock().unwrap().as_deref() == Some(key) {
                return Err(Self::io_error());
            }
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::io_error());
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> StoreResult<()> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(Self::io_error());
            }
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key)
        }
    }

    fn seeded() -> (Arc<FaultyStore>, AnnotationService) {
        let store = Arc::new(FaultyStore::default());
        store.inner.put("alice/notes", b"{}").unwrap();
        let service = AnnotationService::new(store.clone());
        (store, service)
    }

    // -----------------------------------------------------------------------
    // Collection gate
    // -----------------------------------------------------------------------

    #[test]
    fn missing_collection_fails_every_operation() {
        let (store, service) = seeded();
        store.inner.put("bob/other/x", b"{}").unwrap();

        let err = service.create("bob", "other", Some(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, ApiError::CollectionNotFound(ref k) if k == "bob/other"));
        assert!(matches!(
            service.create("bob", "other", None),
            Err(ApiError::CollectionNotFound(_))
        ));
        assert!(matches!(
            service.get("bob", "other", "x"),
            Err(ApiError::CollectionNotFound(_))
        ));
        assert!(matches!(
            service.delete("bob", "other", "x"),
            Err(ApiError::CollectionNotFound(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn aliasing_segments_never_find_a_collection() {
        let (store, service) = seeded();
        // "alice/notes" + "x" is an annotation-shaped key, not a collection.
        store.inner.put("alice/notes/x", b"{}").unwrap();
        assert!(matches!(
            service.get("alice/notes", "x", "anything"),
            Err(ApiError::CollectionNotFound(_))
        ));
        assert!(matches!(
            service.create("alice", "", Some(json!({}))),
            Err(ApiError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn collection_lookup_failure_is_internal() {
        let (store, service) = seeded();
        store.fail_reads_of("alice/notes");
        assert!(matches!(
            service.create("alice", "notes", Some(json!({}))),
            Err(ApiError::Internal(_))
        ));
        assert!(matches!(service.get("alice", "notes", "x"), Err(ApiError::Internal(_))));
        assert!(matches!(service.delete("alice", "notes", "x"), Err(ApiError::Internal(_))));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    #[test]
    fn create_without_payload_is_bad_request() {
        let (store, service) = seeded();
        assert!(matches!(
            service.create("alice", "notes", None),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            service.create("alice", "notes", Some(Value::Null)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            service.create("alice", "notes", Some(json!(["not", "an", "object"]))),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.len(), 1);
    }

    #[test]
    fn create_assigns_fresh_id_and_writes_once() {
        let (store, service) = seeded();
        let created = service
            .create("alice", "notes", Some(json!({"text": "hi"})))
            .unwrap();

        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(created.location, format!("/alice/notes/{}", created.id));
        let body = created.resource.body();
        assert_eq!(body["id"], created.id.as_str());
        assert_eq!(body["text"], "hi");
        assert_eq!(body["type"], "Annotation");
        assert_eq!(body["partOf"]["id"], "/alice/notes/");

        let stored: Value =
            serde_json::from_slice(&store.inner.get(&format!("alice/notes/{}", created.id)).unwrap())
                .unwrap();
        assert_eq!(stored, json!({"text": "hi", "id": created.id.as_str()}));
    }

    #[test]
    fn create_overwrites_client_id() {
        let (_, service) = seeded();
        let created = service
            .create("alice", "notes", Some(json!({"id": "mine", "text": "hi"})))
            .unwrap();
        assert_ne!(created.id.as_str(), "mine");
        assert_eq!(created.resource.body()["id"], created.id.as_str());
    }

    #[test]
    fn repeated_creates_yield_distinct_ids() {
        let (store, service) = seeded();
        let ids: HashSet<String> = (0..50)
            .map(|i| {
                service
                    .create("alice", "notes", Some(json!({"n": i})))
                    .unwrap()
                    .id
                    .to_string()
            })
            .collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.writes.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn identifier_collision_is_bad_request() {
        let store = Arc::new(InMemoryKvStore::new());
        store.put("alice/notes", b"{}").unwrap();
        store.put("alice/notes/fixed", b"{\"id\":\"fixed\",\"text\":\"original\"}").unwrap();
        let service = AnnotationService::with_id_generator(store.clone(), Arc::new(FixedIds("fixed")));

        let err = service
            .create("alice", "notes", Some(json!({"text": "intruder"})))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(
            store.get("alice/notes/fixed").unwrap(),
            b"{\"id\":\"fixed\",\"text\":\"original\"}"
        );
    }

    #[test]
    fn collision_with_fallback_insert_new_is_bad_request() {
        // FaultyStore relies on the trait's default get-then-put.
        let store = Arc::new(FaultyStore::default());
        store.inner.put("alice/notes", b"{}").unwrap();
        let service = AnnotationService::with_id_generator(store.clone(), Arc::new(FixedIds("dup")));

        service.create("alice", "notes", Some(json!({"n": 1}))).unwrap();
        assert!(matches!(
            service.create("alice", "notes", Some(json!({"n": 2}))),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn existence_check_failure_is_internal_without_write() {
        let store = Arc::new(FaultyStore::default());
        store.inner.put("alice/notes", b"{}").unwrap();
        store.fail_reads_of("alice/notes/fixed");
        let service = AnnotationService::with_id_generator(store.clone(), Arc::new(FixedIds("fixed")));

        assert!(matches!(
            service.create("alice", "notes", Some(json!({}))),
            Err(ApiError::Internal(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn write_failure_is_internal() {
        let (store, service) = seeded();
        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            service.create("alice", "notes", Some(json!({"text": "hi"}))),
            Err(ApiError::Internal(_))
        ));
        assert_eq!(store.inner.len(), 1);
    }

    #[test]
    fn body_is_parsed_after_collection_check() {
        let (store, service) = seeded();
        assert!(matches!(
            service.create_from_body("bob", "missing", b"{not json"),
            Err(ApiError::CollectionNotFound(ref k)) if k == "bob/missing"
        ));
        assert!(matches!(
            service.create_from_body("alice", "notes", b"{not json"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            service.create_from_body("alice", "notes", b" \n"),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        let created = service
            .create_from_body("alice", "notes", br#"{"text":"hi"}"#)
            .unwrap();
        assert_eq!(created.resource.body()["text"], "hi");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_body_is_absent() {
        assert_eq!(parse_payload(b"").unwrap(), None);
        assert_eq!(parse_payload(b" \n").unwrap(), None);
    }

    #[test]
    fn json_body_is_parsed() {
        assert_eq!(
            parse_payload(br#"{"text":"hi"}"#).unwrap(),
            Some(json!({"text": "hi"}))
        );
        assert_eq!(parse_payload(b"null").unwrap(), Some(Value::Null));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        assert!(matches!(parse_payload(b"{text"), Err(ApiError::BadRequest(_))));
    }

    // -----------------------------------------------------------------------
    // Get
    // -----------------------------------------------------------------------

    #[test]
    fn create_then_get_roundtrips() {
        let (_, service) = seeded();
        let payload = json!({"text": "hi", "target": {"source": "http://example.org/page"}});
        let created = service.create("alice", "notes", Some(payload)).unwrap();

        let resource = service.get("alice", "notes", created.id.as_str()).unwrap();
        assert_eq!(resource, created.resource);
        let body = resource.body();
        assert_eq!(body["text"], "hi");
        assert_eq!(body["target"]["source"], "http://example.org/page");
        assert_eq!(body["id"], created.id.as_str());
    }

    #[test]
    fn get_unknown_annotation_is_not_found() {
        let (_, service) = seeded();
        assert!(matches!(
            service.get("alice", "notes", "nope"),
            Err(ApiError::AnnotationNotFound(ref k)) if k == "alice/notes/nope"
        ));
    }

    #[test]
    fn get_read_failure_is_internal() {
        let (store, service) = seeded();
        store.inner.put("alice/notes/x", b"{}").unwrap();
        store.fail_reads_of("alice/notes/x");
        assert!(matches!(service.get("alice", "notes", "x"), Err(ApiError::Internal(_))));
    }

    #[test]
    fn get_undecodable_record_is_internal() {
        let (store, service) = seeded();
        store.inner.put("alice/notes/x", b"not json").unwrap();
        assert!(matches!(service.get("alice", "notes", "x"), Err(ApiError::Internal(_))));
        store.inner.put("alice/notes/y", b"[1,2]").unwrap();
        assert!(matches!(service.get("alice", "notes", "y"), Err(ApiError::Internal(_))));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_succeeds_once() {
        let (store, service) = seeded();
        let created = service.create("alice", "notes", Some(json!({"text": "hi"}))).unwrap();

        service.delete("alice", "notes", created.id.as_str()).unwrap();
        assert!(matches!(
            service.delete("alice", "notes", created.id.as_str()),
            Err(ApiError::AnnotationNotFound(_))
        ));
        assert!(matches!(
            service.get("alice", "notes", created.id.as_str()),
            Err(ApiError::AnnotationNotFound(_))
        ));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
        assert!(store.inner.contains("alice/notes").unwrap());
    }

    #[test]
    fn delete_unknown_annotation_is_not_found() {
        let (store, service) = seeded();
        assert!(matches!(
            service.delete("alice", "notes", "never"),
            Err(ApiError::AnnotationNotFound(_))
        ));
        assert!(matches!(
            service.delete("alice", "notes", "a/b"),
            Err(ApiError::AnnotationNotFound(_))
        ));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delete_failure_is_internal() {
        let (store, service) = seeded();
        store.inner.put("alice/notes/x", b"{}").unwrap();
        store.fail_deletes.store(true, Ordering::SeqCst);
        assert!(matches!(service.delete("alice", "notes", "x"), Err(ApiError::Internal(_))));
        assert!(store.inner.contains("alice/notes/x").unwrap());
    }

    #[test]
    fn delete_probe_failure_is_internal() {
        let (store, service) = seeded();
        store.inner.put("alice/notes/x", b"{}").unwrap();
        store.fail_reads_of("alice/notes/x");
        assert!(matches!(service.delete("alice", "notes", "x"), Err(ApiError::Internal(_))));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }
}
