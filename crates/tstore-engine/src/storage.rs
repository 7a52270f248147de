//! [`TopicStorage`]: the engine facade over a document store and a blob store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tstore_blob::BlobStore;
use tstore_docs::{DocumentStore, Filter, Update, UpdateOutcome};
use tstore_types::codec::{encode_record, normalize_document};
use tstore_types::{
    BlobHandle, Document, Record, RecordId, TypeError, Value, ID_KEY, MARKER_PREFIX, META_KEY,
};

use crate::cascade::{delete_blobs, CascadeReport};
use crate::cursor::RecordCursor;
use crate::error::{EngineError, EngineResult};
use crate::externalize::{externalize, validate_for_write, Externalizer};
use crate::internalize::materialize;
use crate::walker::TreeWalker;

/// First capture time and record count for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub time: Option<DateTime<Utc>>,
    pub count: u64,
}

/// What a delete call removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Records removed from the document store.
    pub records: u64,
    /// Blobs the cascade visited.
    pub blobs: CascadeReport,
}

/// Stores records with binary payloads across two stores.
///
/// Binary leaves go to the blob store; the document store holds the
/// record's stored shape with marker-prefixed handles in their place. Both
/// stores are shared handles, so one `TopicStorage` may serve many threads.
///
/// There is no transaction across the stores:
/// - an insert whose document write fails leaves its blobs orphaned;
/// - a delete whose record removal fails leaves the record pointing at
///   deleted blobs, and a retry completes it.
///
/// Both cases are reported in the returned error and logged at `warn`.
pub struct TopicStorage {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    walker: TreeWalker,
}

impl TopicStorage {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            docs,
            blobs,
            walker: TreeWalker::new(),
        }
    }

    pub fn with_walker(mut self, walker: TreeWalker) -> Self {
        self.walker = walker;
        self
    }

    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.docs
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Externalize `record`'s binary leaves, then store its shape.
    pub fn insert_one(&self, record: &Record) -> EngineResult<RecordId> {
        let doc = encode_record(record).map_err(EngineError::Encode)?;
        let (stored, written) = externalize(&self.walker, self.blobs.as_ref(), doc)?;
        match self.docs.insert_one(stored) {
            Ok(id) => {
                tracing::info!(%id, blobs = written.len(), "record inserted");
                Ok(id)
            }
            Err(source) => {
                for handle in &written {
                    tracing::warn!(id = %record.id, %handle, "blob orphaned by failed document insert");
                }
                Err(EngineError::WriteFailed {
                    orphaned: written,
                    source,
                })
            }
        }
    }

    /// Set top-level `fields` on the first record matching `filter`.
    ///
    /// Binary values are externalized like on insert. Fields that replace an
    /// externalized value (or a sub-document holding some) release the old
    /// blobs once the document update has succeeded.
    pub fn update_one(&self, filter: &Filter, fields: Document) -> EngineResult<UpdateOutcome> {
        if let Some(key) = [ID_KEY, META_KEY].into_iter().find(|k| fields.contains_key(k)) {
            return Err(EngineError::InvalidArgument(format!("'{key}' cannot be updated")));
        }
        validate_for_write(&fields, self.walker.max_depth())?;
        let fields = normalize_document(fields).map_err(EngineError::Encode)?;

        let Some(current) = self.docs.find_one(filter)? else {
            return Ok(UpdateOutcome::default());
        };
        let id = stored_id(&current)?;

        let mut replaced = Document::new();
        let mut unset = Vec::new();
        for key in fields.keys() {
            let marked = format!("{MARKER_PREFIX}{key}");
            if let Some(old) = current.get(&marked) {
                replaced.insert(marked.clone(), old.clone());
            }
            if let Some(old @ Value::Document(_)) = current.get(key) {
                replaced.insert(key.clone(), old.clone());
            }
            unset.push(key.clone());
            unset.push(marked);
        }

        let (set, written) = Externalizer::new(self.blobs.as_ref()).apply(&self.walker, fields)?;
        let update = Update { set, unset };
        let outcome = match self.docs.update_one(&Filter::by_id(&id), &update) {
            Ok(outcome) => outcome,
            Err(source) => {
                for handle in &written {
                    tracing::warn!(%id, %handle, "blob orphaned by failed document update");
                }
                return Err(EngineError::WriteFailed {
                    orphaned: written,
                    source,
                });
            }
        };

        // The record vanished between lookup and update; the new blobs have no owner.
        if outcome.matched == 0 {
            self.release(&id, &written);
            return Ok(outcome);
        }

        match delete_blobs(&self.walker, self.blobs.as_ref(), &replaced) {
            Ok(report) => {
                tracing::info!(%id, released = report.deleted.len(), "record updated");
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "replaced blobs could not be released");
            }
        }
        Ok(outcome)
    }

    pub fn update_one_by_id(&self, id: &RecordId, fields: Document) -> EngineResult<UpdateOutcome> {
        self.update_one(&Filter::by_id(id), fields)
    }

    fn release(&self, id: &RecordId, handles: &[BlobHandle]) {
        for handle in handles {
            if let Err(err) = self.blobs.delete(handle) {
                tracing::warn!(%id, %handle, error = %err, "blob orphaned by failed release");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Lazily materialize every record matching `filter`.
    pub fn find(&self, filter: &Filter) -> EngineResult<RecordCursor> {
        let stream = self.docs.find(filter)?;
        Ok(RecordCursor::new(stream, Arc::clone(&self.blobs), self.walker))
    }

    pub fn find_one(&self, filter: &Filter) -> EngineResult<Option<Record>> {
        self.docs
            .find_one(filter)?
            .map(|stored| materialize(&self.walker, self.blobs.as_ref(), stored))
            .transpose()
    }

    /// Fetch one record by id, failing with `RecordNotFound` when absent.
    pub fn find_by_id(&self, id: &RecordId) -> EngineResult<Record> {
        self.find_one(&Filter::by_id(id))?
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))
    }

    pub fn find_by_session_id(&self, session: &str) -> EngineResult<RecordCursor> {
        self.find(&Filter::by_session(session))
    }

    pub fn count(&self, filter: &Filter) -> EngineResult<u64> {
        Ok(self.docs.count(filter)?)
    }

    /// Every session with its first capture time and record count.
    pub fn get_unique_sessions(&self) -> EngineResult<BTreeMap<String, SessionInfo>> {
        Ok(self
            .docs
            .session_summary()?
            .into_iter()
            .map(|row| {
                let info = SessionInfo {
                    time: row.first_seen,
                    count: row.count,
                };
                (row.session, info)
            })
            .collect())
    }

    /// Aggregation pipelines are not supported by this engine.
    pub fn aggregate(&self, _pipeline: &[Document]) -> EngineResult<Vec<Record>> {
        Err(EngineError::Unsupported("aggregate pipelines"))
    }

    // -----------------------------------------------------------------------
    // Delete path
    // -----------------------------------------------------------------------

    /// Delete the first record matching `filter` and the blobs it references.
    ///
    /// Fails with `RecordNotFound`, without touching the blob store, when
    /// nothing matches.
    pub fn delete_one(&self, filter: &Filter) -> EngineResult<DeleteReport> {
        let Some(stored) = self.docs.find_one(filter)? else {
            return Err(EngineError::RecordNotFound(format!("{:?}", filter.conditions())));
        };
        self.delete_stored(&stored)
    }

    pub fn delete_by_id(&self, id: &RecordId) -> EngineResult<DeleteReport> {
        let Some(stored) = self.docs.find_one(&Filter::by_id(id))? else {
            return Err(EngineError::RecordNotFound(id.to_string()));
        };
        self.delete_stored(&stored)
    }

    /// Delete every matching record, cascading each one.
    ///
    /// Matching nothing is not an error. The first failure stops the sweep;
    /// records deleted before it stay deleted.
    pub fn delete_many(&self, filter: &Filter) -> EngineResult<DeleteReport> {
        let mut stream = self.docs.find(filter)?;
        let mut report = DeleteReport::default();
        while let Some(stored) = stream.next_document()? {
            let one = self.delete_stored(&stored)?;
            report.records += one.records;
            report.blobs.merge(one.blobs);
        }
        Ok(report)
    }

    fn delete_stored(&self, stored: &Document) -> EngineResult<DeleteReport> {
        let id = stored_id(stored)?;
        let blobs = delete_blobs(&self.walker, self.blobs.as_ref(), stored)?;
        let records = self.docs.delete_one(&Filter::by_id(&id))?;
        tracing::info!(%id, blobs = blobs.deleted.len(), "record deleted");
        Ok(DeleteReport { records, blobs })
    }
}

impl std::fmt::Debug for TopicStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicStorage")
            .field("walker", &self.walker)
            .finish_non_exhaustive()
    }
}

fn stored_id(stored: &Document) -> EngineResult<RecordId> {
    let raw = stored
        .get(ID_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Decode(TypeError::MissingField(ID_KEY.into())))?;
    raw.parse().map_err(EngineError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use bytes::Bytes;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tstore_blob::{BlobError, BlobResult, FsBlobStore, InMemoryBlobStore};
    use tstore_docs::{
        DocError, DocResult, DocumentStream, FsDocumentStore, InMemoryDocumentStore, SessionSummary,
    };

    /// Counts calls and can fail the n-th put (1-based, 0 = never).
    #[derive(Default)]
    struct CountingBlobs {
        inner: InMemoryBlobStore,
        fail_put_on: usize,
        puts: AtomicUsize,
        gets: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl CountingBlobs {
        fn calls(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
                + self.gets.load(Ordering::SeqCst)
                + self.deletes.load(Ordering::SeqCst)
        }
    }

    impl BlobStore for CountingBlobs {
        fn put(&self, data: Bytes) -> BlobResult<BlobHandle> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_put_on {
                return Err(BlobError::Unavailable("injected put failure".into()));
            }
            self.inner.put(data)
        }
        fn get(&self, handle: &BlobHandle) -> BlobResult<Bytes> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(handle)
        }
        fn delete(&self, handle: &BlobHandle) -> BlobResult<bool> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(handle)
        }
        fn exists(&self, handle: &BlobHandle) -> BlobResult<bool> {
            self.inner.exists(handle)
        }
    }

    /// Document store whose writes always fail.
    struct RejectingDocs;

    impl DocumentStore for RejectingDocs {
        fn insert_one(&self, _doc: Document) -> DocResult<RecordId> {
            Err(DocError::Unavailable("disk full".into()))
        }
        fn update_one(&self, _filter: &Filter, _update: &Update) -> DocResult<UpdateOutcome> {
            Err(DocError::Unavailable("disk full".into()))
        }
        fn find(&self, _filter: &Filter) -> DocResult<Box<dyn DocumentStream>> {
            Err(DocError::Unavailable("disk full".into()))
        }
        fn delete_one(&self, _filter: &Filter) -> DocResult<u64> {
            Ok(0)
        }
        fn delete_many(&self, _filter: &Filter) -> DocResult<u64> {
            Ok(0)
        }
        fn count(&self, _filter: &Filter) -> DocResult<u64> {
            Ok(0)
        }
        fn session_summary(&self) -> DocResult<Vec<SessionSummary>> {
            Ok(Vec::new())
        }
    }

    fn storage() -> (TopicStorage, Arc<InMemoryDocumentStore>, Arc<CountingBlobs>) {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let blobs = Arc::new(CountingBlobs::default());
        let storage = TopicStorage::new(docs.clone(), blobs.clone());
        (storage, docs, blobs)
    }

    fn has_marker_keys(doc: &Document) -> bool {
        doc.iter().any(|(k, v)| {
            k.starts_with(MARKER_PREFIX) || v.as_document().is_some_and(has_marker_keys)
        })
    }

    // -----------------------------------------------------------------------
    // Insert / find
    // -----------------------------------------------------------------------

    #[test]
    fn ten_megabyte_payload_round_trips() {
        let (storage, docs, blobs) = storage();
        let payload = Bytes::from(vec![0xA5u8; 10 * 1024 * 1024]);
        let record = Record::new(
            Document::new()
                .with("a", 1i64)
                .with("b", Document::new().with("c", payload.clone())),
        );

        let id = storage.insert_one(&record).unwrap();
        assert_eq!(id, record.id);
        assert_eq!(blobs.inner.total_bytes(), 10 * 1024 * 1024);

        // The document store never sees the payload.
        let raw = docs.get_raw(&id).unwrap();
        assert!(!Value::Document(raw.clone()).any(&|v| v.is_binary()));
        assert!(raw.get_path(&format!("b.{MARKER_PREFIX}c")).is_some());

        let back = storage.find_by_id(&id).unwrap();
        assert_eq!(back.get("a"), Some(&Value::Int(1)));
        assert_eq!(back.body.get_path("b.c"), Some(&Value::Binary(payload)));
        assert!(!has_marker_keys(&back.body));
        assert_eq!(back, record);
    }

    #[test]
    fn file_backed_round_trip_keeps_wrapper_shaped_objects() {
        let dir = tempfile::tempdir().unwrap();
        let open = || {
            let docs = Arc::new(FsDocumentStore::open(dir.path().join("docs")).unwrap());
            let blobs = Arc::new(FsBlobStore::open(dir.path().join("blobs")).unwrap());
            TopicStorage::new(docs, blobs)
        };
        let record = Record::new(
            Document::new()
                .with("x", Document::new().with("$binary", "00"))
                .with("y", Document::new().with("$binary", "zz"))
                .with("$date", "not a date")
                .with("img", vec![9u8; 64]),
        )
        .with_session("S1");

        let storage = open();
        let id = storage.insert_one(&record).unwrap();
        assert_eq!(storage.find_by_id(&id).unwrap(), record);
        drop(storage);

        let reopened = open();
        assert_eq!(reopened.find_by_id(&id).unwrap(), record);
        assert_eq!(reopened.count(&Filter::all()).unwrap(), 1);
    }

    #[test]
    fn find_one_and_missing_ids() {
        let (storage, _, _) = storage();
        assert!(storage.find_one(&Filter::all()).unwrap().is_none());
        let err = storage.find_by_id(&RecordId::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn find_by_session_streams_matches() {
        let (storage, _, _) = storage();
        for (session, n) in [("S1", 0i64), ("S2", 1), ("S1", 2)] {
            let record = Record::new(Document::new().with("n", n)).with_session(session);
            storage.insert_one(&record).unwrap();
        }
        let ns: Vec<i64> = storage
            .find_by_session_id("S1")
            .unwrap()
            .map(|r| r.unwrap().get("n").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(ns, vec![0, 2]);
        assert_eq!(storage.count(&Filter::by_session("S2")).unwrap(), 1);
    }

    #[test]
    fn insert_rejects_reserved_and_overflowing_input() {
        let (storage, _, blobs) = storage();
        let reserved = Record::new(Document::new().with(format!("{MARKER_PREFIX}x"), 1i64));
        assert_eq!(
            storage.insert_one(&reserved).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let id_in_body = Record::new(Document::new().with(ID_KEY, "mine"));
        assert_eq!(
            storage.insert_one(&id_in_body).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let overflow = Record::new(Document::new().with("u", u64::MAX));
        assert_eq!(
            storage.insert_one(&overflow).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(blobs.calls(), 0);
    }

    #[test]
    fn session_aggregation() {
        let (storage, _, _) = storage();
        let t = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        for secs in [10, 20, 30] {
            let record = Record::new(Document::new().with("x", 1i64))
                .with_session("S1")
                .with_sys_time(t(secs));
            storage.insert_one(&record).unwrap();
        }
        let s2 = Record::new(Document::new()).with_session("S2").with_sys_time(t(30));
        storage.insert_one(&s2).unwrap();

        let sessions = storage.get_unique_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(
            sessions["S1"],
            SessionInfo {
                time: Some(t(10)),
                count: 3
            }
        );
        assert_eq!(
            sessions["S2"],
            SessionInfo {
                time: Some(t(30)),
                count: 1
            }
        );
    }

    #[test]
    fn aggregate_is_unsupported() {
        let (storage, _, _) = storage();
        let err = storage.aggregate(&[Document::new()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    // -----------------------------------------------------------------------
    // Partial failures
    // -----------------------------------------------------------------------

    #[test]
    fn second_put_failure_leaves_first_blob_orphaned() {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let blobs = Arc::new(CountingBlobs {
            fail_put_on: 2,
            ..Default::default()
        });
        let storage = TopicStorage::new(docs.clone(), blobs.clone());
        let record = Record::new(
            Document::new()
                .with("first", vec![1u8; 64])
                .with("second", vec![2u8; 64]),
        );

        let err = storage.insert_one(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalStoreFailure);
        assert_eq!(err.orphaned().len(), 1);
        // Documented gap: the first blob stays stored and nothing was inserted.
        let orphan = err.orphaned()[0];
        assert_eq!(blobs.inner.get(&orphan).unwrap(), Bytes::from(vec![1u8; 64]));
        assert!(docs.is_empty());
    }

    #[test]
    fn failed_document_insert_reports_all_blobs() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let storage = TopicStorage::new(Arc::new(RejectingDocs), blobs.clone());
        let record = Record::new(Document::new().with("a", vec![1u8]).with("b", vec![2u8]));
        let err = storage.insert_one(&record).unwrap_err();
        assert!(matches!(err, EngineError::WriteFailed { .. }));
        assert_eq!(err.orphaned().len(), 2);
        assert_eq!(blobs.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[test]
    fn update_replaces_externalized_field_and_releases_old_blob() {
        let (storage, docs, blobs) = storage();
        let record = Record::new(Document::new().with("img", vec![1u8; 16]).with("n", 1i64));
        let id = storage.insert_one(&record).unwrap();
        let old = blobs.inner.handles();
        assert_eq!(old.len(), 1);

        let outcome = storage
            .update_one_by_id(&id, Document::new().with("img", vec![2u8; 16]))
            .unwrap();
        assert_eq!(outcome.matched, 1);

        let now = blobs.inner.handles();
        assert_eq!(now.len(), 1);
        assert_ne!(now, old);
        let back = storage.find_by_id(&id).unwrap();
        assert_eq!(back.get("img"), Some(&Value::from(vec![2u8; 16])));
        assert_eq!(back.get("n"), Some(&Value::Int(1)));
        let raw = docs.get_raw(&id).unwrap();
        assert_eq!(
            raw.get(&format!("{MARKER_PREFIX}img")).and_then(Value::as_handle),
            Some(&now[0])
        );
        assert!(raw.get("img").is_none());
    }

    #[test]
    fn update_binary_to_scalar_drops_marker() {
        let (storage, docs, blobs) = storage();
        let id = storage
            .insert_one(&Record::new(Document::new().with("img", vec![1u8; 4])))
            .unwrap();
        storage
            .update_one_by_id(&id, Document::new().with("img", "gone"))
            .unwrap();
        let raw = docs.get_raw(&id).unwrap();
        assert!(!raw.contains_key(&format!("{MARKER_PREFIX}img")));
        assert_eq!(raw.get("img"), Some(&Value::from("gone")));
        assert!(blobs.inner.is_empty());
    }

    #[test]
    fn update_of_missing_record_matches_nothing() {
        let (storage, _, blobs) = storage();
        let outcome = storage
            .update_one_by_id(&RecordId::new(), Document::new().with("img", vec![1u8]))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(blobs.calls(), 0);
    }

    #[test]
    fn update_rejects_reserved_and_marker_keys() {
        let (storage, _, blobs) = storage();
        let record = Record::new(Document::new().with("n", 1i64)).with_session("S1");
        let id = storage.insert_one(&record).unwrap();
        for fields in [
            Document::new().with(ID_KEY, "x"),
            Document::new().with(META_KEY, 5i64),
            Document::new().with(META_KEY, Document::new().with("session", 4i64)),
            Document::new().with(format!("{MARKER_PREFIX}y"), 1i64),
        ] {
            let err = storage.update_one_by_id(&id, fields).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(blobs.calls(), 0);
        assert_eq!(storage.find_by_id(&id).unwrap(), record);
    }

    #[test]
    fn update_replacing_sub_document_releases_nested_blobs() {
        let (storage, docs, blobs) = storage();
        let record = Record::new(
            Document::new()
                .with("a", 1i64)
                .with("b", Document::new().with("c", vec![7u8; 32]).with("d", 2i64)),
        );
        let id = storage.insert_one(&record).unwrap();
        let old = blobs.inner.handles();
        assert_eq!(old.len(), 1);

        storage
            .update_one_by_id(&id, Document::new().with("b", Document::new().with("e", 3i64)))
            .unwrap();

        assert!(blobs.inner.is_empty());
        assert!(matches!(blobs.get(&old[0]), Err(BlobError::NotFound(_))));
        let raw = docs.get_raw(&id).unwrap();
        assert!(!has_marker_keys(&raw));
        let back = storage.find_by_id(&id).unwrap();
        assert_eq!(back.get("a"), Some(&Value::Int(1)));
        assert_eq!(back.body.get_path("b.e"), Some(&Value::Int(3)));
        assert!(back.body.get_path("b.c").is_none());
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_cascades_every_blob() {
        let (storage, docs, blobs) = storage();
        let record = Record::new(
            Document::new()
                .with("a", vec![1u8; 8])
                .with("b", Document::new().with("c", vec![2u8; 8]).with("d", vec![3u8; 8])),
        );
        let id = storage.insert_one(&record).unwrap();
        let handles = blobs.inner.handles();
        assert_eq!(handles.len(), 3);

        let report = storage.delete_by_id(&id).unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.blobs.deleted.len(), 3);
        for handle in &handles {
            assert!(matches!(blobs.get(handle), Err(BlobError::NotFound(_))));
        }
        assert!(docs.is_empty());
    }

    #[test]
    fn second_delete_is_not_found_without_blob_calls() {
        let (storage, _, blobs) = storage();
        let id = storage
            .insert_one(&Record::new(Document::new().with("a", vec![1u8; 8])))
            .unwrap();
        storage.delete_by_id(&id).unwrap();

        let before = blobs.calls();
        let err = storage.delete_by_id(&id).unwrap_err();
        assert!(matches!(err, EngineError::RecordNotFound(_)));
        assert_eq!(blobs.calls(), before);

        let err = storage.delete_one(&Filter::by_id(&id)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(blobs.calls(), before);
    }

    #[test]
    fn delete_many_cascades_each_match() {
        let (storage, docs, blobs) = storage();
        for session in ["A", "B", "A"] {
            let record = Record::new(Document::new().with("p", vec![9u8; 4])).with_session(session);
            storage.insert_one(&record).unwrap();
        }
        let report = storage.delete_many(&Filter::by_session("A")).unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.blobs.deleted.len(), 2);
        assert_eq!(docs.len(), 1);
        assert_eq!(blobs.inner.len(), 1);

        let none = storage.delete_many(&Filter::by_session("A")).unwrap();
        assert_eq!(none, DeleteReport::default());
    }

    #[test]
    fn shared_across_threads() {
        let (storage, _, _) = storage();
        let storage = Arc::new(storage);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    let record = Record::new(Document::new().with("blob", vec![i as u8; 32]));
                    let id = storage.insert_one(&record).unwrap();
                    storage.find_by_id(&id).unwrap()
                })
            })
            .collect();
        for handle in handles {
            let record = handle.join().unwrap();
            assert!(record.get("blob").is_some_and(Value::is_binary));
        }
    }
}
