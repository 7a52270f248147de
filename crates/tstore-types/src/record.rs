use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::value::{Document, Value};

/// Unique identifier for a record (UUID v7 for time-ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Generate a new time-ordered record ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short_id())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidRecordId(format!("{s}: {e}")))
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::String(id.to_string())
    }
}

/// Metadata stored under the reserved `_ts_meta` namespace.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RecordMeta {
    /// Collection session this record was captured in.
    pub session: Option<String>,
    /// Wall-clock capture time.
    pub sys_time: Option<DateTime<Utc>>,
}

/// A typed record: identifier, metadata and a nested body.
///
/// The body must not use the reserved top-level keys `_id` and `_ts_meta`;
/// the codec rejects such records on encode.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub meta: RecordMeta,
    pub body: Document,
}

impl Record {
    /// Create a record captured now, outside of any session.
    pub fn new(body: Document) -> Self {
        Self {
            id: RecordId::new(),
            meta: RecordMeta {
                session: None,
                sys_time: Some(Utc::now()),
            },
            body,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.meta.session = Some(session.into());
        self
    }

    pub fn with_sys_time(mut self, time: DateTime<Utc>) -> Self {
        self.meta.sys_time = Some(time);
        self
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn session(&self) -> Option<&str> {
        self.meta.session.as_deref()
    }
}
