use tstore_types::{Document, RecordId, ID_KEY};

use crate::error::{DocError, DocResult};
use crate::filter::{Filter, Update, UpdateOutcome};
use crate::session::SessionSummary;

/// Sequential result stream returned by [`DocumentStore::find`].
///
/// Implementations materialize one document per call and hold no more than
/// their own read-ahead buffer.
pub trait DocumentStream: Send {
    /// Pull the next matching document. `Ok(None)` once the stream ends.
    fn next_document(&mut self) -> DocResult<Option<Document>>;

    /// Fetch the `index`-th matching document without moving the stream.
    fn document_at(&mut self, index: usize) -> DocResult<Option<Document>>;
}

/// Document store keyed by the `_id` string field.
///
/// All implementations must satisfy these invariants:
/// - `insert_one` requires an `_id` string and rejects duplicates.
/// - `find` and `session_summary` observe documents in insertion order.
/// - Deletes and updates of unmatched filters succeed with zero counts.
pub trait DocumentStore: Send + Sync {
    fn insert_one(&self, doc: Document) -> DocResult<RecordId>;

    /// Apply `update` to the first document matching `filter`.
    fn update_one(&self, filter: &Filter, update: &Update) -> DocResult<UpdateOutcome>;

    fn find(&self, filter: &Filter) -> DocResult<Box<dyn DocumentStream>>;

    /// First document matching `filter`.
    fn find_one(&self, filter: &Filter) -> DocResult<Option<Document>> {
        self.find(filter)?.next_document()
    }

    /// Delete the first matching document. Returns the number removed.
    fn delete_one(&self, filter: &Filter) -> DocResult<u64>;

    /// Delete every matching document. Returns the number removed.
    fn delete_many(&self, filter: &Filter) -> DocResult<u64>;

    fn count(&self, filter: &Filter) -> DocResult<u64>;

    /// Group documents by session: first-seen capture time and count.
    fn session_summary(&self) -> DocResult<Vec<SessionSummary>>;
}

/// Read the `_id` string of a document being inserted.
pub(crate) fn document_id(doc: &Document) -> DocResult<RecordId> {
    let raw = doc
        .get(ID_KEY)
        .and_then(|v| v.as_str())
        .ok_or(DocError::MissingId)?;
    Ok(raw.parse()?)
}
