use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Produced locally by the transform rules.
    Heuristic,
    /// Proposed by the external edit provider.
    External,
}

/// A whole-file rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Root-relative, `/`-separated path.
    pub rel: String,
    /// Absolute path the result is written to.
    pub abs: PathBuf,
    /// Content as read from disk.
    pub before: String,
    /// Proposed content.
    pub after: String,
    pub source: Provenance,
}

impl Edit {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// The merged result: at most one edit per path, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    pub edits: Vec<Edit>,
    pub changed_files: Vec<String>,
}

impl EditSet {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Merges edits by path; for a given path the last edit added wins.
///
/// Add heuristic edits before external ones so that external proposals take
/// precedence. [`EditCollector::merge`] does exactly that.
#[derive(Debug, Default)]
pub struct EditCollector {
    by_rel: BTreeMap<String, Edit>,
}

impl EditCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local edits first, then external ones.
    pub fn merge(local: Vec<Edit>, external: Vec<Edit>) -> EditSet {
        let mut collector = Self::new();
        collector.extend(local);
        collector.extend(external);
        collector.finish()
    }

    pub fn add(&mut self, edit: Edit) {
        self.by_rel.insert(edit.rel.clone(), edit);
    }

    pub fn extend<I: IntoIterator<Item = Edit>>(&mut self, edits: I) {
        for edit in edits {
            self.add(edit);
        }
    }

    /// Drops no-op edits and returns the final set.
    pub fn finish(self) -> EditSet {
        let edits: Vec<Edit> = self
            .by_rel
            .into_values()
            .filter(|edit| !edit.is_noop())
            .collect();
        let changed_files = edits.iter().map(|edit| edit.rel.clone()).collect();
        EditSet {
            edits,
            changed_files,
        }
    }
}
