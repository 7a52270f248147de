use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tstore_types::{Document, RecordId, ID_KEY};

use crate::error::{DocError, DocResult};
use crate::filter::{Filter, Update, UpdateOutcome};
use crate::session::{summarize_sessions, SessionSummary};
use crate::traits::{document_id, DocumentStore, DocumentStream};

/// In-memory document store for tests, local demos and embedding.
///
/// Documents are kept in insertion order. Result streams are live views:
/// they re-read the shared state on every pull instead of snapshotting it.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    docs: BTreeMap<u64, Document>,
    ids: HashMap<String, u64>,
    next_seq: u64,
}

impl StoreState {
    fn first_match(&self, filter: &Filter) -> Option<u64> {
        self.docs
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| *seq)
    }

    fn remove(&mut self, seq: u64) -> Option<Document> {
        let doc = self.docs.remove(&seq)?;
        if let Some(id) = doc.get(ID_KEY).and_then(|v| v.as_str()) {
            self.ids.remove(id);
        }
        Some(doc)
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored document by id, bypassing any stream.
    pub fn get_raw(&self, id: &RecordId) -> Option<Document> {
        let state = self.inner.read().expect("lock poisoned");
        let seq = state.ids.get(&id.to_string())?;
        state.docs.get(seq).cloned()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_one(&self, doc: Document) -> DocResult<RecordId> {
        let id = document_id(&doc)?;
        let key = id.to_string();
        let mut state = self.inner.write().expect("lock poisoned");
        if state.ids.contains_key(&key) {
            return Err(DocError::DuplicateId(key));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.ids.insert(key, seq);
        state.docs.insert(seq, doc);
        Ok(id)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> DocResult<UpdateOutcome> {
        let mut state = self.inner.write().expect("lock poisoned");
        let Some(seq) = state.first_match(filter) else {
            return Ok(UpdateOutcome::default());
        };
        let modified = match state.docs.get_mut(&seq) {
            Some(doc) => update.apply(doc),
            None => false,
        };
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    fn find(&self, filter: &Filter) -> DocResult<Box<dyn DocumentStream>> {
        Ok(Box::new(MemoryStream {
            inner: Arc::clone(&self.inner),
            filter: filter.clone(),
            next_seq: 0,
        }))
    }

    fn delete_one(&self, filter: &Filter) -> DocResult<u64> {
        let mut state = self.inner.write().expect("lock poisoned");
        let removed = state
            .first_match(filter)
            .and_then(|seq| state.remove(seq))
            .is_some();
        Ok(u64::from(removed))
    }

    fn delete_many(&self, filter: &Filter) -> DocResult<u64> {
        let mut state = self.inner.write().expect("lock poisoned");
        let seqs: Vec<u64> = state
            .docs
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| *seq)
            .collect();
        for seq in &seqs {
            state.remove(*seq);
        }
        Ok(seqs.len() as u64)
    }

    fn count(&self, filter: &Filter) -> DocResult<u64> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.docs.values().filter(|doc| filter.matches(doc)).count() as u64)
    }

    fn session_summary(&self) -> DocResult<Vec<SessionSummary>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(summarize_sessions(state.docs.values()))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .finish()
    }
}

/// Live stream over an [`InMemoryDocumentStore`].
struct MemoryStream {
    inner: Arc<RwLock<StoreState>>,
    filter: Filter,
    next_seq: u64,
}

impl DocumentStream for MemoryStream {
    fn next_document(&mut self) -> DocResult<Option<Document>> {
        let state = self.inner.read().expect("lock poisoned");
        let hit = state
            .docs
            .range(self.next_seq..)
            .find(|(_, doc)| self.filter.matches(doc));
        Ok(hit.map(|(seq, doc)| {
            self.next_seq = seq + 1;
            doc.clone()
        }))
    }

    fn document_at(&mut self, index: usize) -> DocResult<Option<Document>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .docs
            .values()
            .filter(|doc| self.filter.matches(doc))
            .nth(index)
            .cloned())
    }
}
