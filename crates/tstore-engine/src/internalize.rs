//! Read-path leaf transform: resolves marked handles back into payloads.

use tstore_blob::{BlobError, BlobStore};
use tstore_types::codec::decode_record;
use tstore_types::{Document, Record, Value, MARKER_PREFIX};

use crate::error::{EngineError, EngineResult};
use crate::walker::TreeWalker;

/// Leaf transform inverting [`Externalizer`](crate::Externalizer).
///
/// A leaf is resolved only when its key carries [`MARKER_PREFIX`] and its
/// value is a [`Value::Handle`]. A marked key holding anything else is
/// passed through unchanged and logged.
pub struct Internalizer<'a> {
    blobs: &'a dyn BlobStore,
    fetched: usize,
}

impl<'a> Internalizer<'a> {
    pub fn new(blobs: &'a dyn BlobStore) -> Self {
        Self { blobs, fetched: 0 }
    }

    /// Number of blobs fetched so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn transform(&mut self, path: &str, key: String, value: Value) -> EngineResult<(String, Value)> {
        let Some(original) = key.strip_prefix(MARKER_PREFIX) else {
            return Ok((key, value));
        };
        let Value::Handle(handle) = value else {
            tracing::warn!(
                key = path,
                found = value.type_name(),
                "marker-prefixed key without a blob handle left unresolved"
            );
            return Ok((key, value));
        };

        let original = original.to_string();
        let data = self.blobs.get(&handle).map_err(|source| match source {
            BlobError::NotFound(_) => EngineError::BlobMissing {
                key: path.to_string(),
                handle,
            },
            source => EngineError::BlobGet {
                key: path.to_string(),
                handle,
                source,
            },
        })?;
        tracing::debug!(key = path, %handle, size = data.len(), "internalized blob");
        self.fetched += 1;
        Ok((original, Value::Binary(data)))
    }

    pub fn apply(mut self, walker: &TreeWalker, doc: Document) -> EngineResult<Document> {
        walker.run(doc, &mut |path: &str, key: String, value: Value| {
            self.transform(path, key, value)
        })
    }
}

/// Decode a stored document and resolve its externalized leaves.
pub fn materialize(walker: &TreeWalker, blobs: &dyn BlobStore, stored: Document) -> EngineResult<Record> {
    let mut record = decode_record(stored).map_err(EngineError::Decode)?;
    record.body = Internalizer::new(blobs).apply(walker, record.body)?;
    Ok(record)
}
