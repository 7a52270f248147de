//! Document store boundary for topic-store.
//!
//! This crate provides:
//! - [`Filter`] / [`Update`] -- the minimal equality/existence query and
//!   top-level `$set`/`$unset` update the engine needs
//! - [`DocumentStore`] / [`DocumentStream`] trait boundaries
//! - [`InMemoryDocumentStore`] for tests and embedding
//! - [`FsDocumentStore`], one JSON file per document
//! - [`SessionSummary`] -- the group-by-session summarization query
//!
//! Stores never interpret blob handles; externalization happens in the
//! engine before documents reach this layer.

pub mod error;
pub mod filter;
pub mod fs;
pub mod memory;
pub mod session;
pub mod traits;

pub use error::{DocError, DocResult};
pub use filter::{Condition, Filter, Update, UpdateOutcome};
pub use fs::FsDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use session::{summarize_sessions, SessionSummary};
pub use traits::{DocumentStore, DocumentStream};
