//! Blob storage for topic-store.
//!
//! Binary payloads that would push a document past the document store's
//! per-record size limit live here instead. The store hands out an opaque
//! [`BlobHandle`](tstore_types::BlobHandle) per put; the document keeps only
//! the handle.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one checksummed file per handle under a directory
//!
//! # Design Rules
//!
//! 1. Every put mints a new handle; identical bytes are never deduplicated.
//! 2. Blobs are immutable once written.
//! 3. `get` of an unknown handle is an error, `delete` of one is not.
//! 4. Contents are verified against their BLAKE3 checksum on read.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use blob::StoredBlob;
pub use error::{BlobError, BlobResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
