use crate::edits::Edit;
use crate::fingerprint::short_hash;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One file's change: always a single hunk replacing the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub rel: String,
    pub before_hash: String,
    pub after_hash: String,
    /// Number of `-` lines, i.e. lines in the original content.
    pub deleted: usize,
    /// Number of `+` lines, i.e. lines in the new content.
    pub inserted: usize,
    before: String,
    after: String,
}

impl FilePatch {
    pub fn from_edit(edit: &Edit) -> Self {
        Self {
            rel: edit.rel.clone(),
            before_hash: short_hash(&edit.before),
            after_hash: short_hash(&edit.after),
            deleted: edit.before.split('\n').count(),
            inserted: edit.after.split('\n').count(),
            before: edit.before.clone(),
            after: edit.after.clone(),
        }
    }

    fn render_into(&self, out: &mut String) {
        let rel = &self.rel;
        let _ = writeln!(out, "diff --git a/{rel} b/{rel}");
        let _ = writeln!(out, "index {}..{} 100644", self.before_hash, self.after_hash);
        let _ = writeln!(out, "--- a/{rel}");
        let _ = writeln!(out, "+++ b/{rel}");
        let _ = writeln!(out, "@@ -1,{} +1,{} @@", self.deleted, self.inserted);
        for line in self.before.split('\n') {
            let _ = writeln!(out, "-{line}");
        }
        for line in self.after.split('\n') {
            let _ = writeln!(out, "+{line}");
        }
        out.push('\n');
    }
}

/// A reviewable patch made of whole-file replacement hunks.
///
/// This is deliberately not a minimal diff. The hunks can be applied
/// wholesale or handed to review tooling, but a strict patch tool may
/// disagree about trailing-newline handling.
#[derive(Debug, Clone)]
pub struct PatchDocument {
    pub root: PathBuf,
    pub generated: DateTime<Utc>,
    pub files: Vec<FilePatch>,
}

impl PatchDocument {
    /// Builds a document with one hunk per edit, in path order.
    pub fn synthesize(root: &Path, generated: DateTime<Utc>, edits: &[Edit]) -> Self {
        let mut files: Vec<FilePatch> = edits.iter().map(FilePatch::from_edit).collect();
        files.sort_by(|a, b| a.rel.cmp(&b.rel));
        Self {
            root: root.to_path_buf(),
            generated,
            files,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# DesignV1 patch\n");
        let _ = writeln!(out, "# Root: {}", self.root.display());
        let _ = writeln!(
            out,
            "# Generated: {}",
            self.generated.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        out.push('\n');
        for file in &self.files {
            file.render_into(&mut out);
        }
        out
    }
}
