//! Foundation types for topic-store.
//!
//! Every other topic-store crate depends on `tstore-types`. It defines the
//! value model shared by the document store, the blob store and the
//! externalization engine.
//!
//! # Key Types
//!
//! - [`Value`] -- a document value: scalar, nested [`Document`], sequence,
//!   inline binary payload, or externalized [`BlobHandle`]
//! - [`Document`] -- ordered string-keyed mapping of values
//! - [`Record`] -- typed record wrapper: identifier, metadata and body
//! - [`RecordId`] -- UUID v7 record identifier stored under `_id`
//! - [`BlobHandle`] -- opaque reference to content held in a blob store
//!
//! The [`codec`] module converts between [`Record`] and the stored
//! [`Document`] form and between documents and JSON.

pub mod codec;
pub mod error;
pub mod handle;
pub mod keys;
pub mod record;
pub mod value;

pub use error::TypeError;
pub use handle::BlobHandle;
pub use keys::{ID_KEY, MARKER_PREFIX, META_KEY, SESSION_KEY, SESSION_PATH, SYS_TIME_KEY, SYS_TIME_PATH};
pub use record::{Record, RecordId, RecordMeta};
pub use value::{Document, Value};
