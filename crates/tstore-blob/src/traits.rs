use bytes::Bytes;
use tstore_types::BlobHandle;

use crate::error::BlobResult;

/// Handle-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - `put` always mints a fresh handle, even for identical bytes.
/// - `get` of a handle that was never written or has been deleted fails
///   with [`BlobError::NotFound`](crate::BlobError::NotFound).
/// - `delete` is tolerant: removing an absent handle returns `Ok(false)`.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Store a payload and return its handle.
    fn put(&self, data: Bytes) -> BlobResult<BlobHandle>;

    /// Fetch the payload stored under `handle`.
    fn get(&self, handle: &BlobHandle) -> BlobResult<Bytes>;

    /// Delete a payload. Returns `true` if it existed.
    fn delete(&self, handle: &BlobHandle) -> BlobResult<bool>;

    /// Check whether a payload exists.
    fn exists(&self, handle: &BlobHandle) -> BlobResult<bool>;
}
