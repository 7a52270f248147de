use tstore_types::{Document, RecordId, Value, ID_KEY, SESSION_PATH};

/// A single predicate over a dotted document path.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// The value at `path` equals `value`.
    Eq { path: String, value: Value },
    /// The path resolves (or does not resolve) to a value.
    Exists { path: String, exists: bool },
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq { path, value } => doc.get_path(path) == Some(value),
            Self::Exists { path, exists } => doc.get_path(path).is_some() == *exists,
        }
    }
}

/// Conjunction of conditions. The empty filter matches every document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Match every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &RecordId) -> Self {
        Self::eq(ID_KEY, id.to_string())
    }

    pub fn by_session(session: &str) -> Self {
        Self::eq(SESSION_PATH, session)
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(path, value)
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::all().and_exists(path, true)
    }

    pub fn and_eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn and_exists(mut self, path: impl Into<String>, exists: bool) -> Self {
        self.conditions.push(Condition::Exists {
            path: path.into(),
            exists,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// The record id this filter pins, if it has an `_id` equality condition.
    pub fn pinned_id(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Eq {
                path,
                value: Value::String(id),
            } if path == ID_KEY => Some(id.as_str()),
            _ => None,
        })
    }
}

/// Top-level field update: `$unset` is applied before `$set`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    pub set: Document,
    pub unset: Vec<String>,
}

impl Update {
    pub fn set(fields: Document) -> Self {
        Self {
            set: fields,
            unset: Vec::new(),
        }
    }

    pub fn with_unset(mut self, key: impl Into<String>) -> Self {
        self.unset.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Apply to `doc`, returning `true` if anything changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let mut changed = false;
        for key in &self.unset {
            changed |= doc.remove(key).is_some();
        }
        for (key, value) in &self.set {
            if doc.get(key) != Some(value) {
                doc.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Outcome of an update call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}
