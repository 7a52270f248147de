use thiserror::Error;

/// Errors produced by type conversions and the record codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid blob handle: {0}")]
    InvalidHandle(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("record body uses reserved key '{0}'")]
    ReservedKey(String),

    #[error("integer at '{key}' does not fit the store's signed range: {value}")]
    IntegerOverflow { key: String, value: u64 },

    #[error("non-finite float at '{key}'")]
    NonFiniteFloat { key: String },

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("malformed field '{field}': {reason}")]
    Malformed { field: String, reason: String },

    #[error("json error: {0}")]
    Json(String),
}
