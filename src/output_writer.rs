use crate::cancel::CancelFlag;
use crate::edits::{EditSet, Provenance};
use crate::errors::Result;
use crate::patch::PatchDocument;
use crate::state_manager::{StateManager, file_stamp, write_atomic};
use crate::summary::ScanSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How the final edit set is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Overwrite source files in place.
    Apply,
    /// Touch nothing but the report.
    DryRun,
    /// Write a patch file for review.
    #[default]
    Patch,
}

impl Mode {
    pub fn from_flags(apply: bool, dry_run: bool) -> Self {
        if apply {
            Mode::Apply
        } else if dry_run {
            Mode::DryRun
        } else {
            Mode::Patch
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Apply => "apply",
            Mode::DryRun => "dry-run",
            Mode::Patch => "patch",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-edit provenance as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEdit {
    pub rel: String,
    pub source: Provenance,
}

/// The audit record written for every improve run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub root: String,
    pub mode: Mode,
    pub scan: ScanSummary,
    pub instructions: Option<String>,
    pub changed_files: Vec<String>,
    pub edits: Vec<ReportEdit>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        root: &Path,
        mode: Mode,
        scan: ScanSummary,
        instructions: Option<String>,
        edits: &EditSet,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            root: root.display().to_string(),
            mode,
            scan,
            instructions,
            changed_files: edits.changed_files.clone(),
            edits: edits
                .edits
                .iter()
                .map(|edit| ReportEdit {
                    rel: edit.rel.clone(),
                    source: edit.source,
                })
                .collect(),
            created_at,
        }
    }
}

/// Paths written by [`OutputWriter::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub report_path: PathBuf,
    pub patch_path: Option<PathBuf>,
}

/// Commits an edit set according to a [`Mode`].
///
/// The report is always written first. In apply mode there is no rollback:
/// files written before a failure stay written.
pub struct OutputWriter {
    root: PathBuf,
    mode: Mode,
    state: StateManager,
    cancel: CancelFlag,
}

impl OutputWriter {
    pub fn new(root: &Path, mode: Mode, cancel: CancelFlag) -> Self {
        Self {
            root: root.to_path_buf(),
            mode,
            state: StateManager::new(root),
            cancel,
        }
    }

    pub fn commit(&self, report: &Report, edits: &EditSet) -> Result<WriteOutcome> {
        self.state.ensure_dirs()?;
        let stamp = file_stamp(report.created_at);

        let report_path = self.state.report_path(&stamp);
        self.cancel.check()?;
        write_atomic(&report_path, serde_json::to_string_pretty(report)?.as_bytes())?;
        tracing::info!(path = %report_path.display(), "report written");

        let patch_path = match self.mode {
            Mode::Apply => {
                for edit in &edits.edits {
                    self.cancel.check()?;
                    write_atomic(&edit.abs, edit.after.as_bytes())?;
                    tracing::info!(file = %edit.rel, source = ?edit.source, "applied");
                }
                None
            }
            Mode::DryRun => None,
            Mode::Patch => {
                let patch_path = self.state.patch_path(&stamp);
                let document = PatchDocument::synthesize(&self.root, report.created_at, &edits.edits);
                self.cancel.check()?;
                write_atomic(&patch_path, document.render().as_bytes())?;
                tracing::info!(path = %patch_path.display(), files = document.files.len(), "patch written");
                Some(patch_path)
            }
        };

        Ok(WriteOutcome {
            report_path,
            patch_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::{Edit, EditCollector};
    use crate::errors::Error;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, EditSet) {
        let temp_dir = TempDir::new().unwrap();
        let abs = temp_dir.path().join("page.tsx");
        fs::write(&abs, "before  \n").unwrap();
        let edits = EditCollector::merge(
            vec![Edit {
                rel: "page.tsx".into(),
                abs,
                before: "before  \n".into(),
                after: "before\n".into(),
                source: Provenance::Heuristic,
            }],
            Vec::new(),
        );
        (temp_dir, edits)
    }

    fn report(root: &Path, mode: Mode, edits: &EditSet) -> Report {
        Report::new(root, mode, ScanSummary::default(), Some("calm it down".into()), edits, Utc::now())
    }

    #[test]
    fn test_patch_mode_leaves_sources_alone() {
        let (temp_dir, edits) = fixture();
        let root = temp_dir.path();
        let writer = OutputWriter::new(root, Mode::Patch, CancelFlag::new());

        let outcome = writer.commit(&report(root, Mode::Patch, &edits), &edits).unwrap();
        let patch = fs::read_to_string(outcome.patch_path.unwrap()).unwrap();
        assert!(patch.contains("diff --git a/page.tsx b/page.tsx"));
        assert_eq!(fs::read_to_string(root.join("page.tsx")).unwrap(), "before  \n");
        assert!(outcome.report_path.is_file());
    }

    #[test]
    fn test_apply_mode_writes_sources() {
        let (temp_dir, edits) = fixture();
        let root = temp_dir.path();
        let writer = OutputWriter::new(root, Mode::Apply, CancelFlag::new());

        let outcome = writer.commit(&report(root, Mode::Apply, &edits), &edits).unwrap();
        assert!(outcome.patch_path.is_none());
        assert_eq!(fs::read_to_string(root.join("page.tsx")).unwrap(), "before\n");
        assert_eq!(fs::read_dir(root.join(".designv1/patches")).unwrap().count(), 0);
    }

    #[test]
    fn test_dry_run_only_writes_report() {
        let (temp_dir, edits) = fixture();
        let root = temp_dir.path();
        let writer = OutputWriter::new(root, Mode::DryRun, CancelFlag::new());

        let outcome = writer.commit(&report(root, Mode::DryRun, &edits), &edits).unwrap();
        assert!(outcome.patch_path.is_none());
        assert_eq!(fs::read_to_string(root.join("page.tsx")).unwrap(), "before  \n");

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(outcome.report_path).unwrap()).unwrap();
        assert_eq!(saved["mode"], "dry-run");
        assert_eq!(saved["changedFiles"][0], "page.tsx");
        assert_eq!(saved["edits"][0]["source"], "heuristic");
        assert_eq!(saved["instructions"], "calm it down");
        assert!(saved["createdAt"].is_string());
        assert!(saved["scan"]["files"].is_object());
    }

    #[test]
    fn test_cancelled_before_writes() {
        let (temp_dir, edits) = fixture();
        let root = temp_dir.path();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let writer = OutputWriter::new(root, Mode::Apply, cancel);

        let result = writer.commit(&report(root, Mode::Apply, &edits), &edits);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(fs::read_to_string(root.join("page.tsx")).unwrap(), "before  \n");
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(Mode::from_flags(false, false), Mode::Patch);
        assert_eq!(Mode::from_flags(false, true), Mode::DryRun);
        assert_eq!(Mode::from_flags(true, false), Mode::Apply);
        assert_eq!(Mode::DryRun.to_string(), "dry-run");
    }
}
