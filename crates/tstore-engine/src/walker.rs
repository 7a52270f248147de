//! Recursive document traversal.
//!
//! The walker visits every entry of a nested [`Document`]. Entries whose
//! value is itself a document are descended into and rebuilt; every other
//! entry (scalars, sequences, binary payloads, handles) is a leaf and goes
//! through the caller's transform, which may rename the key and replace the
//! value. Sequences are leaves: the walker never descends into them.
//!
//! Owned documents cannot form cycles, so the depth limit is the only guard
//! needed against runaway structures. Exceeding it is reported as
//! [`EngineError::CyclicStructure`].

use serde::{Deserialize, Serialize};
use tstore_types::{Document, Value};

use crate::error::{EngineError, EngineResult};

/// Nesting depth accepted by default.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How [`TreeWalker::run`] produces its output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    /// Build a fresh document; the input is left untouched.
    #[default]
    Rebuild,
    /// Drain and refill the input's own maps instead of building new ones.
    InPlace,
}

/// Join a parent path and a key with `.`.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeWalker {
    mode: WalkMode,
    max_depth: usize,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeWalker {
    pub fn new() -> Self {
        Self {
            mode: WalkMode::Rebuild,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_mode(mut self, mode: WalkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn mode(&self) -> WalkMode {
        self.mode
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Transform an owned document according to the configured mode.
    ///
    /// The transform receives the dotted path of the leaf, its key and its
    /// value, and returns the replacement key and value.
    pub fn run<F>(&self, doc: Document, f: &mut F) -> EngineResult<Document>
    where
        F: FnMut(&str, String, Value) -> EngineResult<(String, Value)>,
    {
        match self.mode {
            WalkMode::Rebuild => self.walk(&doc, f),
            WalkMode::InPlace => {
                let mut doc = doc;
                self.walk_in_place(&mut doc, f)?;
                Ok(doc)
            }
        }
    }

    /// Build a transformed copy of `doc`, leaving `doc` untouched.
    pub fn walk<F>(&self, doc: &Document, f: &mut F) -> EngineResult<Document>
    where
        F: FnMut(&str, String, Value) -> EngineResult<(String, Value)>,
    {
        self.walk_level(doc, "", 0, f)
    }

    /// Transform `doc` in place.
    ///
    /// On error `doc` holds only the entries processed so far.
    pub fn walk_in_place<F>(&self, doc: &mut Document, f: &mut F) -> EngineResult<()>
    where
        F: FnMut(&str, String, Value) -> EngineResult<(String, Value)>,
    {
        self.walk_level_in_place(doc, "", 0, f)
    }

    fn check_depth(&self, prefix: &str, depth: usize) -> EngineResult<()> {
        if depth > self.max_depth {
            return Err(EngineError::CyclicStructure {
                path: prefix.to_string(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn walk_level<F>(
        &self,
        doc: &Document,
        prefix: &str,
        depth: usize,
        f: &mut F,
    ) -> EngineResult<Document>
    where
        F: FnMut(&str, String, Value) -> EngineResult<(String, Value)>,
    {
        self.check_depth(prefix, depth)?;
        let mut out = Document::new();
        for (key, value) in doc {
            let path = join_path(prefix, key);
            let (new_key, new_value) = match value {
                Value::Document(child) => (
                    key.clone(),
                    Value::Document(self.walk_level(child, &path, depth + 1, f)?),
                ),
                leaf => f(&path, key.clone(), leaf.clone())?,
            };
            insert_unique(&mut out, prefix, new_key, new_value)?;
        }
        Ok(out)
    }

    fn walk_level_in_place<F>(
        &self,
        doc: &mut Document,
        prefix: &str,
        depth: usize,
        f: &mut F,
    ) -> EngineResult<()>
    where
        F: FnMut(&str, String, Value) -> EngineResult<(String, Value)>,
    {
        self.check_depth(prefix, depth)?;
        for (key, value) in doc.take_entries() {
            let path = join_path(prefix, &key);
            let (new_key, new_value) = match value {
                Value::Document(mut child) => {
                    self.walk_level_in_place(&mut child, &path, depth + 1, f)?;
                    (key, Value::Document(child))
                }
                leaf => f(&path, key, leaf)?,
            };
            insert_unique(doc, prefix, new_key, new_value)?;
        }
        Ok(())
    }
}

fn insert_unique(doc: &mut Document, prefix: &str, key: String, value: Value) -> EngineResult<()> {
    if doc.contains_key(&key) {
        return Err(EngineError::KeyCollision {
            path: join_path(prefix, &key),
        });
    }
    doc.insert(key, value);
    Ok(())
}
