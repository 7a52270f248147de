use tstore_types::BlobHandle;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No blob is stored under the handle.
    #[error("blob handle not found: {0}")]
    NotFound(BlobHandle),

    /// Content checksum mismatch on read (data corruption).
    #[error("checksum mismatch for {handle}: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        handle: BlobHandle,
        expected: String,
        computed: String,
    },

    /// The stored blob cannot be decoded.
    #[error("corrupt blob {handle}: {reason}")]
    Corrupt { handle: BlobHandle, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not service the request.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
