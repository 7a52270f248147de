use tstore_types::TypeError;

/// Errors produced by document store operations.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("document has no '_id' string field")]
    MissingId,

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("corrupt document at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("codec error: {0}")]
    Codec(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for document store operations.
pub type DocResult<T> = Result<T, DocError>;
