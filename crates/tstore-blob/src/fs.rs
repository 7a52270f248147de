use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tstore_types::BlobHandle;

use crate::blob::StoredBlob;
use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// Filesystem blob store.
///
/// Each blob is one file at `<root>/<first two hex chars>/<handle hex>`.
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so a crashed put never leaves a partial blob behind.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a blob store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        let hex = handle.to_hex();
        self.root.join(&hex[..2]).join(hex)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, data: Bytes) -> BlobResult<BlobHandle> {
        let handle = BlobHandle::new();
        let path = self.blob_path(&handle);
        let dir = path
            .parent()
            .ok_or_else(|| BlobError::Unavailable(format!("no parent for {}", path.display())))?;
        std::fs::create_dir_all(dir)?;

        let blob = StoredBlob::new(data);
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&blob.to_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| BlobError::Io(e.error))?;

        tracing::debug!(%handle, size = blob.size(), "blob written");
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> BlobResult<Bytes> {
        let raw = match std::fs::read(self.blob_path(handle)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(*handle))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(StoredBlob::from_bytes(handle, Bytes::from(raw))?.data)
    }

    fn delete(&self, handle: &BlobHandle) -> BlobResult<bool> {
        match std::fs::remove_file(self.blob_path(handle)) {
            Ok(()) => {
                tracing::debug!(%handle, "blob removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, handle: &BlobHandle) -> BlobResult<bool> {
        Ok(self.blob_path(handle).is_file())
    }
}
