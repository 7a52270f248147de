use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tstore_types::BlobHandle;

use crate::blob::StoredBlob;
use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Payloads are `Bytes`, so reads share
/// the stored buffer instead of copying it.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobHandle, StoredBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(StoredBlob::size)
            .sum()
    }

    /// Sorted list of every live handle.
    pub fn handles(&self) -> Vec<BlobHandle> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut handles: Vec<BlobHandle> = map.keys().copied().collect();
        handles.sort();
        handles
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, data: Bytes) -> BlobResult<BlobHandle> {
        let handle = BlobHandle::new();
        let blob = StoredBlob::new(data);
        tracing::debug!(%handle, size = blob.size(), "blob put");
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(handle, blob);
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> BlobResult<Bytes> {
        let map = self.blobs.read().expect("lock poisoned");
        let blob = map.get(handle).ok_or(BlobError::NotFound(*handle))?;
        blob.verify(handle)?;
        Ok(blob.data.clone())
    }

    fn delete(&self, handle: &BlobHandle) -> BlobResult<bool> {
        let removed = self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(handle)
            .is_some();
        tracing::debug!(%handle, removed, "blob delete");
        Ok(removed)
    }

    fn exists(&self, handle: &BlobHandle) -> BlobResult<bool> {
        Ok(self
            .blobs
            .read()
            .expect("lock poisoned")
            .contains_key(handle))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
