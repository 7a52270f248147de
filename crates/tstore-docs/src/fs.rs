use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tempfile::NamedTempFile;
use tstore_types::codec::{document_from_json, document_to_json};
use tstore_types::{Document, RecordId};

use crate::error::{DocError, DocResult};
use crate::filter::{Filter, Update, UpdateOutcome};
use crate::session::{summarize_sessions, SessionSummary};
use crate::traits::{document_id, DocumentStream, DocumentStore};

/// Filesystem document store.
///
/// Each document is a JSON file named by a zero-padded insertion sequence
/// number, which doubles as the insertion order. An id index is rebuilt in
/// memory on open. The store assumes a single process owns the directory.
#[derive(Clone)]
pub struct FsDocumentStore {
    inner: Arc<FsInner>,
}

struct FsInner {
    root: PathBuf,
    index: RwLock<FsIndex>,
}

#[derive(Default)]
struct FsIndex {
    /// Insertion sequence → record id.
    seqs: BTreeMap<u64, String>,
    ids: HashMap<String, u64>,
    next_seq: u64,
}

impl FsInner {
    fn doc_path(&self, seq: u64) -> PathBuf {
        self.root.join(format!("{seq:016x}.json"))
    }

    fn read_doc(&self, seq: u64) -> DocResult<Option<Document>> {
        let path = self.doc_path(seq);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|e| DocError::Corrupt {
                location: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(document_from_json(json)?))
    }

    fn write_doc(&self, seq: u64, doc: &Document) -> DocResult<()> {
        let body = serde_json::to_vec(&document_to_json(doc)).map_err(|e| DocError::Corrupt {
            location: self.doc_path(seq).display().to_string(),
            reason: e.to_string(),
        })?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.doc_path(seq))
            .map_err(|e| DocError::Io(e.error))?;
        Ok(())
    }

    fn remove_doc(&self, seq: u64) -> DocResult<()> {
        match std::fs::remove_file(self.doc_path(seq)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Live sequence numbers from `from` onwards, in insertion order.
    fn seqs_from(&self, from: u64) -> Vec<u64> {
        let index = self.index.read().expect("lock poisoned");
        index.seqs.range(from..).map(|(seq, _)| *seq).collect()
    }

    /// Sequence numbers that may match `filter`. An `_id` condition is
    /// resolved through the index instead of scanning every file.
    fn candidates(&self, filter: &Filter) -> Vec<u64> {
        match filter.pinned_id() {
            Some(id) => {
                let index = self.index.read().expect("lock poisoned");
                index.ids.get(id).copied().into_iter().collect()
            }
            None => self.seqs_from(0),
        }
    }

    fn matching(&self, filter: &Filter) -> DocResult<Vec<(u64, Document)>> {
        let mut out = Vec::new();
        for seq in self.candidates(filter) {
            if let Some(doc) = self.read_doc(seq)? {
                if filter.matches(&doc) {
                    out.push((seq, doc));
                }
            }
        }
        Ok(out)
    }

    fn first_match(&self, filter: &Filter) -> DocResult<Option<(u64, Document)>> {
        for seq in self.candidates(filter) {
            if let Some(doc) = self.read_doc(seq)? {
                if filter.matches(&doc) {
                    return Ok(Some((seq, doc)));
                }
            }
        }
        Ok(None)
    }

    fn forget(&self, seq: u64) {
        let mut index = self.index.write().expect("lock poisoned");
        if let Some(id) = index.seqs.remove(&seq) {
            index.ids.remove(&id);
        }
    }
}

impl FsDocumentStore {
    /// Open (creating if needed) a document store in `root`.
    pub fn open(root: impl AsRef<Path>) -> DocResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let inner = FsInner {
            root,
            index: RwLock::new(FsIndex::default()),
        };

        let mut index = FsIndex::default();
        for entry in std::fs::read_dir(&inner.root)? {
            let path = entry?.path();
            let Some(seq) = parse_seq(&path) else {
                continue;
            };
            index.next_seq = index.next_seq.max(seq + 1);
            let doc = match inner.read_doc(seq) {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(DocError::Io(e)) => return Err(DocError::Io(e)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping undecodable document");
                    continue;
                }
            };
            let id = match document_id(&doc) {
                Ok(id) => id.to_string(),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping document without a valid id");
                    continue;
                }
            };
            index.seqs.insert(seq, id.clone());
            index.ids.insert(id, seq);
        }
        tracing::debug!(
            root = %inner.root.display(),
            documents = index.seqs.len(),
            "document store opened"
        );
        *inner.index.write().expect("lock poisoned") = index;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn len(&self) -> usize {
        self.inner.index.read().expect("lock poisoned").seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_seq(path: &Path) -> Option<u64> {
    if path.extension()? != "json" {
        return None;
    }
    u64::from_str_radix(path.file_stem()?.to_str()?, 16).ok()
}

impl DocumentStore for FsDocumentStore {
    fn insert_one(&self, doc: Document) -> DocResult<RecordId> {
        let id = document_id(&doc)?;
        let key = id.to_string();
        let seq = {
            let mut index = self.inner.index.write().expect("lock poisoned");
            if index.ids.contains_key(&key) {
                return Err(DocError::DuplicateId(key));
            }
            let seq = index.next_seq;
            index.next_seq += 1;
            index.ids.insert(key.clone(), seq);
            index.seqs.insert(seq, key);
            seq
        };
        if let Err(e) = self.inner.write_doc(seq, &doc) {
            self.inner.forget(seq);
            return Err(e);
        }
        Ok(id)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> DocResult<UpdateOutcome> {
        let Some((seq, mut doc)) = self.inner.first_match(filter)? else {
            return Ok(UpdateOutcome::default());
        };
        let modified = update.apply(&mut doc);
        if modified {
            self.inner.write_doc(seq, &doc)?;
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    fn find(&self, filter: &Filter) -> DocResult<Box<dyn DocumentStream>> {
        Ok(Box::new(FsStream {
            inner: Arc::clone(&self.inner),
            filter: filter.clone(),
            next_seq: 0,
        }))
    }

    fn find_one(&self, filter: &Filter) -> DocResult<Option<Document>> {
        Ok(self.inner.first_match(filter)?.map(|(_, doc)| doc))
    }

    fn delete_one(&self, filter: &Filter) -> DocResult<u64> {
        let Some((seq, _)) = self.inner.first_match(filter)? else {
            return Ok(0);
        };
        self.inner.remove_doc(seq)?;
        self.inner.forget(seq);
        Ok(1)
    }

    fn delete_many(&self, filter: &Filter) -> DocResult<u64> {
        let hits = self.inner.matching(filter)?;
        for (seq, _) in &hits {
            self.inner.remove_doc(*seq)?;
            self.inner.forget(*seq);
        }
        Ok(hits.len() as u64)
    }

    fn count(&self, filter: &Filter) -> DocResult<u64> {
        Ok(self.inner.matching(filter)?.len() as u64)
    }

    fn session_summary(&self) -> DocResult<Vec<SessionSummary>> {
        let docs: Vec<Document> = self
            .inner
            .matching(&Filter::all())?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        Ok(summarize_sessions(&docs))
    }
}

impl std::fmt::Debug for FsDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDocumentStore")
            .field("root", &self.inner.root)
            .field("document_count", &self.len())
            .finish()
    }
}

/// Stream that reads one document file per pull.
struct FsStream {
    inner: Arc<FsInner>,
    filter: Filter,
    next_seq: u64,
}

impl DocumentStream for FsStream {
    fn next_document(&mut self) -> DocResult<Option<Document>> {
        for seq in self.inner.seqs_from(self.next_seq) {
            self.next_seq = seq + 1;
            if let Some(doc) = self.inner.read_doc(seq)? {
                if self.filter.matches(&doc) {
                    return Ok(Some(doc));
                }
            }
        }
        Ok(None)
    }

    fn document_at(&mut self, index: usize) -> DocResult<Option<Document>> {
        let mut seen = 0;
        for seq in self.inner.seqs_from(0) {
            if let Some(doc) = self.inner.read_doc(seq)? {
                if self.filter.matches(&doc) {
                    if seen == index {
                        return Ok(Some(doc));
                    }
                    seen += 1;
                }
            }
        }
        Ok(None)
    }
}
