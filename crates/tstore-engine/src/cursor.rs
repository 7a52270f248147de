//! Lazy, single-pass cursor over query results.

use std::sync::Arc;

use tstore_blob::BlobStore;
use tstore_docs::DocumentStream;
use tstore_types::Record;

use crate::error::{EngineError, EngineResult};
use crate::internalize::materialize;
use crate::walker::TreeWalker;

/// Lifecycle of a [`RecordCursor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing has been read yet.
    Created,
    /// At least one element has been materialized.
    Active,
    /// The underlying stream has ended. Terminal.
    Exhausted,
}

/// Materializes one record per pull from a document stream.
///
/// Each element is decoded and internalized only when it is requested;
/// the cursor holds no records of its own. It cannot be rewound: once the
/// stream ends every further pull fails with
/// [`EngineError::CursorExhausted`] and a new query is needed.
pub struct RecordCursor {
    stream: Box<dyn DocumentStream>,
    blobs: Arc<dyn BlobStore>,
    walker: TreeWalker,
    state: CursorState,
}

impl RecordCursor {
    pub fn new(stream: Box<dyn DocumentStream>, blobs: Arc<dyn BlobStore>, walker: TreeWalker) -> Self {
        Self {
            stream,
            blobs,
            walker,
            state: CursorState::Created,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Materialize the next record.
    pub fn pull(&mut self) -> EngineResult<Record> {
        if self.state == CursorState::Exhausted {
            return Err(EngineError::CursorExhausted);
        }
        match self.stream.next_document()? {
            Some(doc) => {
                self.state = CursorState::Active;
                materialize(&self.walker, self.blobs.as_ref(), doc)
            }
            None => {
                tracing::trace!("cursor exhausted");
                self.state = CursorState::Exhausted;
                Err(EngineError::CursorExhausted)
            }
        }
    }

    /// Materialize the `index`-th result without moving the cursor.
    ///
    /// `Ok(None)` when the result set is shorter than `index + 1`.
    pub fn get(&mut self, index: usize) -> EngineResult<Option<Record>> {
        if self.state == CursorState::Exhausted {
            return Err(EngineError::CursorExhausted);
        }
        let Some(doc) = self.stream.document_at(index)? else {
            return Ok(None);
        };
        self.state = CursorState::Active;
        materialize(&self.walker, self.blobs.as_ref(), doc).map(Some)
    }

    /// Drain the remaining records into a vector.
    pub fn collect_all(self) -> EngineResult<Vec<Record>> {
        self.collect()
    }
}

impl Iterator for RecordCursor {
    type Item = EngineResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.pull() {
            Err(EngineError::CursorExhausted) => None,
            other => Some(other),
        }
    }
}

impl std::fmt::Debug for RecordCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCursor")
            .field("state", &self.state)
            .field("walker", &self.walker)
            .finish()
    }
}
