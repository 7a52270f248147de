use tstore_blob::BlobError;
use tstore_docs::DocError;
use tstore_types::{BlobHandle, TypeError, MARKER_PREFIX};

/// Coarse classification of engine failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    ConfigurationError,
    NotFound,
    ExternalStoreFailure,
    UnsupportedOperation,
    CursorExhausted,
}

/// Errors produced by the externalization engine.
///
/// Failures that leave blobs without a referencing document carry the
/// stranded handles in `orphaned`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("record encoding failed: {0}")]
    Encode(#[source] TypeError),

    #[error("key '{path}' uses the reserved prefix '{}'", MARKER_PREFIX)]
    ReservedKey { path: String },

    #[error("binary payload inside sequence at '{path}' cannot be externalized")]
    BinaryInSequence { path: String },

    #[error("cyclic or excessively nested structure at '{path}' (depth limit {limit})")]
    CyclicStructure { path: String, limit: usize },

    #[error("transform produced duplicate key '{path}'")]
    KeyCollision { path: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("blob for '{key}' not found: {handle}")]
    BlobMissing { key: String, handle: BlobHandle },

    #[error("blob put for '{key}' failed, {} earlier blob(s) orphaned: {source}", .orphaned.len())]
    BlobPut {
        key: String,
        orphaned: Vec<BlobHandle>,
        source: BlobError,
    },

    #[error("blob get for '{key}' ({handle}) failed: {source}")]
    BlobGet {
        key: String,
        handle: BlobHandle,
        source: BlobError,
    },

    #[error("blob delete for '{key}' ({handle}) failed: {source}")]
    BlobDelete {
        key: String,
        handle: BlobHandle,
        source: BlobError,
    },

    #[error("stored document could not be decoded: {0}")]
    Decode(#[source] TypeError),

    #[error("document store failure: {0}")]
    Store(#[from] DocError),

    #[error("document write failed, {} blob(s) orphaned: {source}", .orphaned.len())]
    WriteFailed {
        orphaned: Vec<BlobHandle>,
        source: DocError,
    },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("cursor exhausted")]
    CursorExhausted,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_)
            | Self::Encode(_)
            | Self::ReservedKey { .. }
            | Self::BinaryInSequence { .. }
            | Self::CyclicStructure { .. }
            | Self::KeyCollision { .. } => ErrorKind::InvalidArgument,
            Self::Config(_) => ErrorKind::ConfigurationError,
            Self::RecordNotFound(_) | Self::BlobMissing { .. } => ErrorKind::NotFound,
            Self::BlobPut { .. }
            | Self::BlobGet { .. }
            | Self::BlobDelete { .. }
            | Self::Decode(_)
            | Self::Store(_)
            | Self::WriteFailed { .. } => ErrorKind::ExternalStoreFailure,
            Self::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Self::CursorExhausted => ErrorKind::CursorExhausted,
        }
    }

    /// Blobs left without a referencing document by this failure.
    pub fn orphaned(&self) -> &[BlobHandle] {
        match self {
            Self::BlobPut { orphaned, .. } | Self::WriteFailed { orphaned, .. } => orphaned,
            _ => &[],
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
