use crate::cancel::CancelFlag;
use crate::errors::Result;
use crate::patterns::PatternSet;
use ignore::{Walk, WalkBuilder};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Globs that are never worth touching: VCS metadata, build output,
/// installed dependencies and the tool's own state directory.
pub const DEFAULT_IGNORES: &[&str] = &[
    "**/.git/**",
    "**/.next/**",
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/coverage/**",
    "**/node_modules/**",
    "**/.designv1/**",
];

/// A discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path on disk.
    pub abs: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub rel: String,
}

/// Knobs for a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Stop after this many files. `None` or `Some(0)` means no cap.
    pub max_files: Option<usize>,
    /// Only keep files matching this glob.
    pub include: Option<String>,
    /// Drop files matching this glob, in addition to [`DEFAULT_IGNORES`].
    pub exclude: Option<String>,
}

/// The composed ignore/include decision for root-relative paths.
///
/// Ignore always wins: a path matching both an ignore pattern and the include
/// pattern is dropped.
#[derive(Debug, Clone)]
pub struct FileFilter {
    ignored: PatternSet,
    included: Option<PatternSet>,
}

impl FileFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        let ignored = PatternSet::compile(DEFAULT_IGNORES.iter().copied().chain(exclude))?;
        let included = match include {
            Some(glob) if !glob.is_empty() => Some(PatternSet::compile([glob])?),
            _ => None,
        };
        Ok(Self { ignored, included })
    }

    pub fn is_ignored(&self, rel: &str) -> bool {
        self.ignored.is_match(rel)
    }

    /// `not ignored(path) and (no include pattern or included(path))`
    pub fn is_eligible(&self, rel: &str) -> bool {
        if self.is_ignored(rel) {
            return false;
        }
        self.included.as_ref().is_none_or(|set| set.is_match(rel))
    }

    /// Whether a whole directory can be skipped without changing the result.
    fn prunes_dir(&self, rel_dir: &str) -> bool {
        self.ignored.covers_dir(rel_dir)
    }
}

/// A lazy, single-pass walk over the files below a root.
///
/// Order is whatever the filesystem hands back; sort the results if you need
/// them stable. Unreadable directories are skipped.
pub struct Discovery {
    root: PathBuf,
    walker: Walk,
    filter: Arc<FileFilter>,
    cap: Option<usize>,
    yielded: usize,
    cancel: Option<CancelFlag>,
}

impl Discovery {
    /// Starts a discovery pass below `root`.
    pub fn new(root: &Path, options: &DiscoveryOptions) -> Result<Self> {
        let root = std::path::absolute(root)?;
        let filter = Arc::new(FileFilter::new(
            options.include.as_deref(),
            options.exclude.as_deref(),
        )?);

        let mut builder = WalkBuilder::new(&root);
        // Only our own globs decide what is skipped.
        builder.standard_filters(false);

        let prune_root = root.clone();
        let prune_filter = Arc::clone(&filter);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            match relative_slash_path(&prune_root, entry.path()) {
                Some(rel) => !prune_filter.prunes_dir(&rel),
                None => true,
            }
        });

        Ok(Self {
            root,
            walker: builder.build(),
            filter,
            cap: options.max_files.filter(|&n| n > 0),
            yielded: 0,
            cancel: None,
        })
    }

    /// Ends the walk early once `cancel` is raised.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for Discovery {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        if self.cap.is_some_and(|cap| self.yielded >= cap) {
            return None;
        }

        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                return None;
            }

            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(rel) = relative_slash_path(&self.root, entry.path()) else {
                continue;
            };
            if !self.filter.is_eligible(&rel) {
                continue;
            }

            self.yielded += 1;
            return Some(FileEntry {
                abs: entry.into_path(),
                rel,
            });
        }
    }
}

/// Convenience wrapper around [`Discovery::new`].
pub fn discover_files(root: &Path, options: &DiscoveryOptions) -> Result<Discovery> {
    Discovery::new(root, options)
}

/// Root-relative path with `/` separators, or `None` when `path` is the root
/// itself or does not live under it.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
