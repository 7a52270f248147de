//! Blob-externalization engine for topic-store.
//!
//! Records may carry binary payloads far larger than a document store
//! accepts per document. On write the engine walks each record, moves every
//! binary leaf into a [`BlobStore`](tstore_blob::BlobStore) and stores the
//! returned handle under a marker-prefixed key instead. Reads invert the
//! move; deletes cascade it.
//!
//! - [`TreeWalker`] -- recursive rebuild of a nested document through a
//!   per-leaf transform
//! - [`Externalizer`] / [`Internalizer`] -- the write and read leaf transforms
//! - [`cascade`] -- blob cleanup ahead of a record delete
//! - [`RecordCursor`] -- lazy, single-pass materialization of query results
//! - [`TopicStorage`] -- the facade tying both stores together
//!
//! The engine is synchronous: every blob and document call blocks the
//! caller, and the blobs of one record are written strictly in traversal
//! order. There is no transaction spanning the two stores; failures that
//! strand blobs are reported in the error and logged with their handles.

pub mod cascade;
pub mod config;
pub mod cursor;
pub mod error;
pub mod externalize;
pub mod internalize;
pub mod storage;
pub mod walker;

pub use cascade::CascadeReport;
pub use config::{endpoint_from_mongo_config, Endpoint, EngineConfig, StorageConfig};
pub use cursor::{CursorState, RecordCursor};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use externalize::Externalizer;
pub use internalize::Internalizer;
pub use storage::{DeleteReport, SessionInfo, TopicStorage};
pub use walker::{TreeWalker, WalkMode};

// Re-export the types callers need alongside the facade.
pub use tstore_docs::{Filter, UpdateOutcome};
pub use tstore_types::{BlobHandle, Document, Record, RecordId, RecordMeta, Value, MARKER_PREFIX};
