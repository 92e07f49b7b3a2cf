use crate::errors::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the state directory created under the project root.
pub const STATE_DIR_NAME: &str = ".designv1";

/// Layout of the root-relative state directory:
///
/// ```text
/// .designv1/
///   patches/improve-<stamp>.patch
///   reports/improve-<stamp>.json
/// ```
#[derive(Debug, Clone)]
pub struct StateManager {
    patches_dir: PathBuf,
    reports_dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: &Path) -> Self {
        let state_dir = project_root.join(STATE_DIR_NAME);
        Self {
            patches_dir: state_dir.join("patches"),
            reports_dir: state_dir.join("reports"),
        }
    }

    /// Creates both subdirectories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.patches_dir, &self.reports_dir] {
            fs::create_dir_all(dir).map_err(|source| Error::Write {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn patch_path(&self, stamp: &str) -> PathBuf {
        self.patches_dir.join(format!("improve-{stamp}.patch"))
    }

    pub fn report_path(&self, stamp: &str) -> PathBuf {
        self.reports_dir.join(format!("improve-{stamp}.json"))
    }
}

/// ISO-8601 timestamp with `:` replaced so it is safe in file names,
/// e.g. `2024-05-01T12-30-00.000Z`.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-")
}

/// Writes `contents` to `path` through a temp file in the same directory.
///
/// An existing file keeps its permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let wrap = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(parent).map_err(wrap)?;
    temp_file.write_all(contents).map_err(wrap)?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp_file.path(), metadata.permissions()).map_err(wrap)?;
    }

    temp_file.persist(path).map_err(|err| wrap(err.error))?;
    Ok(())
}
