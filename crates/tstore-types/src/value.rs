use std::collections::btree_map;
use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::handle::BlobHandle;

/// A single document value.
///
/// Inline binary payloads ([`Value::Binary`]) and externalized payloads
/// ([`Value::Handle`]) are distinct variants, so a stored document can never
/// confuse a user string with a blob reference.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer. Narrowed to [`Value::Int`] by the record codec.
    UInt(u64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Binary(Bytes),
    Array(Vec<Value>),
    Document(Document),
    /// Reference to a payload that was moved to the blob store.
    Handle(BlobHandle),
}

impl Value {
    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Time(_) => "time",
            Self::Binary(_) => "binary",
            Self::Array(_) => "array",
            Self::Document(_) => "document",
            Self::Handle(_) => "handle",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&BlobHandle> {
        match self {
            Self::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Returns `true` if this value or anything nested inside it matches
    /// `pred`.
    pub fn any(&self, pred: &dyn Fn(&Value) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Self::Array(items) => items.iter().any(|v| v.any(pred)),
            Self::Document(doc) => doc.values().any(|v| v.any(pred)),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Self::Document(v)
    }
}

impl From<BlobHandle> for Value {
    fn from(v: BlobHandle) -> Self {
        Self::Handle(v)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Ordered string-keyed mapping of values.
///
/// Keys are kept sorted, so two documents with the same entries compare and
/// serialize identically regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    entries: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Resolve a dotted path such as `_ts_meta.session` through nested
    /// documents.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.entries.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Drain every entry, leaving the document empty but reusable.
    pub fn take_entries(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut self.entries)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, Value)> for Document {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Document {
        Document::new().with("a", 1i64).with(
            "b",
            Document::new()
                .with("c", vec![1u8, 2, 3])
                .with("d", Document::new().with("e", "deep")),
        )
    }

    #[test]
    fn insert_and_get() {
        let mut doc = Document::new();
        assert!(doc.insert("x", 5i64).is_none());
        assert_eq!(doc.get("x"), Some(&Value::Int(5)));
        assert_eq!(doc.insert("x", 6i64), Some(Value::Int(5)));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn get_path_walks_nested_documents() {
        let doc = nested();
        assert_eq!(doc.get_path("a"), Some(&Value::Int(1)));
        assert_eq!(
            doc.get_path("b.d.e"),
            Some(&Value::String("deep".into()))
        );
        assert!(doc.get_path("b.c.x").is_none());
        assert!(doc.get_path("missing").is_none());
    }

    #[test]
    fn keys_are_sorted() {
        let doc = Document::new().with("z", 1i64).with("a", 2i64).with("m", 3i64);
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn any_finds_nested_binary() {
        let doc = Value::Document(nested());
        assert!(doc.any(&Value::is_binary));
        let arr = Value::Array(vec![Value::Int(1), Value::from(vec![0u8])]);
        assert!(arr.any(&Value::is_binary));
        assert!(!Value::Array(vec![Value::Int(1)]).any(&Value::is_binary));
    }

    #[test]
    fn take_entries_empties_document() {
        let mut doc = nested();
        let entries = doc.take_entries();
        assert_eq!(entries.len(), 2);
        assert!(doc.is_empty());
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(vec![1u8]).type_name(), "binary");
        assert_eq!(Value::Handle(BlobHandle::new()).type_name(), "handle");
    }
}
