//! Blob cleanup ahead of a record delete.
//!
//! The cascade walks a record's stored shape and deletes every blob it
//! references. It runs before the record itself is removed, so a retry after
//! a failed record delete can still find the handles. Blob deletes are
//! tolerant: a handle that is already gone is counted as missing, not
//! treated as an error.

use tstore_blob::BlobStore;
use tstore_types::{BlobHandle, Document, Value, MARKER_PREFIX};

use crate::error::{EngineError, EngineResult};
use crate::walker::TreeWalker;

/// Outcome of a blob cascade for one record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Handles whose blob was deleted.
    pub deleted: Vec<BlobHandle>,
    /// Handles that no longer resolved when the cascade reached them.
    pub missing: Vec<BlobHandle>,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.deleted.len() + self.missing.len()
    }

    pub fn merge(&mut self, other: CascadeReport) {
        self.deleted.extend(other.deleted);
        self.missing.extend(other.missing);
    }
}

/// Delete every blob referenced by `stored`.
///
/// The first failing delete aborts the cascade; blobs deleted before it stay
/// deleted.
pub fn delete_blobs(walker: &TreeWalker, blobs: &dyn BlobStore, stored: &Document) -> EngineResult<CascadeReport> {
    let mut report = CascadeReport::default();
    walker.walk(stored, &mut |path: &str, key: String, value: Value| {
        if let Value::Handle(handle) = value {
            if !key.starts_with(MARKER_PREFIX) {
                return Ok((key, value));
            }
            let removed = blobs.delete(&handle).map_err(|source| EngineError::BlobDelete {
                key: path.to_string(),
                handle,
                source,
            })?;
            if removed {
                report.deleted.push(handle);
            } else {
                tracing::warn!(key = path, %handle, "cascade found blob already missing");
                report.missing.push(handle);
            }
        }
        Ok((key, value))
    })?;
    Ok(report)
}
