//! Write-path leaf transform: moves binary payloads into the blob store.

use tstore_blob::BlobStore;
use tstore_types::{BlobHandle, Document, Value, MARKER_PREFIX};

use crate::error::{EngineError, EngineResult};
use crate::walker::{join_path, TreeWalker};

/// Reject documents the write path cannot store unambiguously.
///
/// Checked before any blob is written, so a rejected document never leaves
/// orphans behind:
/// - keys starting with [`MARKER_PREFIX`], at any depth;
/// - caller-supplied [`Value::Handle`]s;
/// - binary payloads inside sequences, which have no key to carry the marker;
/// - nesting deeper than the walker accepts.
pub fn validate_for_write(doc: &Document, max_depth: usize) -> EngineResult<()> {
    validate_level(doc, "", 0, max_depth)
}

fn validate_level(doc: &Document, prefix: &str, depth: usize, max_depth: usize) -> EngineResult<()> {
    if depth > max_depth {
        return Err(EngineError::CyclicStructure {
            path: prefix.to_string(),
            limit: max_depth,
        });
    }
    for (key, value) in doc {
        let path = join_path(prefix, key);
        if key.starts_with(MARKER_PREFIX) {
            return Err(EngineError::ReservedKey { path });
        }
        match value {
            Value::Document(child) => validate_level(child, &path, depth + 1, max_depth)?,
            Value::Array(items) => validate_sequence(items, &path, depth + 1, max_depth)?,
            Value::Handle(_) => {
                return Err(EngineError::InvalidArgument(format!(
                    "'{path}' holds a blob handle; handles are assigned by the store"
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_sequence(items: &[Value], path: &str, depth: usize, max_depth: usize) -> EngineResult<()> {
    if depth > max_depth {
        return Err(EngineError::CyclicStructure {
            path: path.to_string(),
            limit: max_depth,
        });
    }
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}.{i}");
        match item {
            Value::Binary(_) => return Err(EngineError::BinaryInSequence { path: item_path }),
            Value::Handle(_) => {
                return Err(EngineError::InvalidArgument(format!(
                    "'{item_path}' holds a blob handle; handles are assigned by the store"
                )))
            }
            Value::Document(child) => validate_level(child, &item_path, depth + 1, max_depth)?,
            Value::Array(inner) => validate_sequence(inner, &item_path, depth + 1, max_depth)?,
            _ => {}
        }
    }
    Ok(())
}

/// Leaf transform that externalizes binary payloads.
///
/// Each binary leaf is written with one blocking `put`, in traversal order,
/// and replaced by `(MARKER_PREFIX + key, Value::Handle)`. Handles written
/// so far are tracked so that an aborted walk can report them.
pub struct Externalizer<'a> {
    blobs: &'a dyn BlobStore,
    written: Vec<BlobHandle>,
}

impl<'a> Externalizer<'a> {
    pub fn new(blobs: &'a dyn BlobStore) -> Self {
        Self {
            blobs,
            written: Vec::new(),
        }
    }

    /// Handles written by this externalizer, in write order.
    pub fn written(&self) -> &[BlobHandle] {
        &self.written
    }

    pub fn transform(&mut self, path: &str, key: String, value: Value) -> EngineResult<(String, Value)> {
        let Value::Binary(data) = value else {
            return Ok((key, value));
        };
        let size = data.len();
        match self.blobs.put(data) {
            Ok(handle) => {
                tracing::debug!(key = path, %handle, size, "externalized binary leaf");
                self.written.push(handle);
                Ok((format!("{MARKER_PREFIX}{key}"), Value::Handle(handle)))
            }
            Err(source) => {
                for handle in &self.written {
                    tracing::warn!(%handle, failed_key = path, "blob orphaned by failed put");
                }
                Err(EngineError::BlobPut {
                    key: path.to_string(),
                    orphaned: self.written.clone(),
                    source,
                })
            }
        }
    }

    /// Externalize every binary leaf of `doc`.
    ///
    /// Returns the stored shape and the handles written for it.
    pub fn apply(mut self, walker: &TreeWalker, doc: Document) -> EngineResult<(Document, Vec<BlobHandle>)> {
        let stored = walker.run(doc, &mut |path: &str, key: String, value: Value| {
            self.transform(path, key, value)
        })?;
        Ok((stored, self.written))
    }
}

/// Validate `doc` and externalize its binary leaves into `blobs`.
pub fn externalize(
    walker: &TreeWalker,
    blobs: &dyn BlobStore,
    doc: Document,
) -> EngineResult<(Document, Vec<BlobHandle>)> {
    validate_for_write(&doc, walker.max_depth())?;
    Externalizer::new(blobs).apply(walker, doc)
}
