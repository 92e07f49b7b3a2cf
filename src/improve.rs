use crate::cancel::CancelFlag;
use crate::edits::{Edit, EditCollector, Provenance};
use crate::errors::{Error, Result};
use crate::loader::{ContentLoader, PROVIDER_MAX_BYTES};
use crate::output_writer::{Mode, OutputWriter, Report};
use crate::provider::{CandidateFile, EditProvider, MAX_CANDIDATES, Proposal, ProposalContext};
use crate::scanner::{Discovery, DiscoveryOptions, FileEntry};
use crate::summary::summarize;
use crate::transform::{TransformEngine, is_ui_source};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cap on files considered for edits when the caller sets none.
pub const DEFAULT_MAX_FILES: usize = 800;

/// Inputs for one improve run.
#[derive(Debug, Clone)]
pub struct ImproveOptions {
    pub root: PathBuf,
    pub mode: Mode,
    /// As given by the caller. The summary honours `max_files` as is; edit
    /// candidates fall back to [`DEFAULT_MAX_FILES`].
    pub discovery: DiscoveryOptions,
    pub instructions: Option<String>,
    /// Upper bound on the provider call.
    pub provider_timeout: Duration,
    /// Draw a progress bar while transforming.
    pub show_progress: bool,
}

impl ImproveOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mode: Mode::default(),
            discovery: DiscoveryOptions::default(),
            instructions: None,
            provider_timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            show_progress: false,
        }
    }
}

/// What an improve run did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveOutcome {
    pub root: String,
    pub mode: Mode,
    pub changed_files: Vec<String>,
    pub patch_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub notes: Vec<String>,
}

/// Runs the whole pipeline: discover, transform, ask the provider, merge,
/// then commit according to the mode.
///
/// Provider trouble of any kind only produces a note. Write failures and
/// cancellation abort the run.
pub async fn improve_codebase(
    options: &ImproveOptions,
    provider: Option<&dyn EditProvider>,
    cancel: &CancelFlag,
) -> Result<ImproveOutcome> {
    let root = std::path::absolute(&options.root)?;
    let mut notes = Vec::new();

    let scan = summarize(&root, &options.discovery, cancel)?;

    let candidate_options = DiscoveryOptions {
        max_files: options.discovery.max_files.or(Some(DEFAULT_MAX_FILES)),
        ..options.discovery.clone()
    };
    let candidates: Vec<FileEntry> = Discovery::new(&root, &candidate_options)?
        .with_cancel(cancel.clone())
        .filter(|entry| is_ui_source(&entry.rel))
        .collect();
    cancel.check()?;
    tracing::info!(candidates = candidates.len(), "discovery complete");

    let local = heuristic_edits(&candidates, options.show_progress, cancel)?;

    let external = match provider {
        Some(provider) => {
            notes.push(format!("External proposals enabled via {}.", provider.describe()));
            let context = ProposalContext {
                scan: scan.clone(),
                files: provider_candidates(&candidates),
                instructions: options.instructions.clone(),
            };
            let proposals =
                request_proposals(provider, &context, options.provider_timeout, cancel, &mut notes).await?;
            let guard = ProposalGuard::new(&root, &candidates);
            proposals
                .into_iter()
                .filter_map(|proposal| guard.resolve(proposal))
                .collect()
        }
        None => {
            notes.push("External proposals disabled (set OPENAI_API_KEY to enable).".to_string());
            Vec::new()
        }
    };

    let edits = EditCollector::merge(local, external);
    tracing::info!(changed = edits.changed_files.len(), "edits merged");

    let report = Report::new(
        &root,
        options.mode,
        scan,
        options.instructions.clone(),
        &edits,
        Utc::now(),
    );
    let written = OutputWriter::new(&root, options.mode, cancel.clone()).commit(&report, &edits)?;

    match options.mode {
        Mode::Apply => {}
        Mode::DryRun => notes.push("No files written (--dry-run).".to_string()),
        Mode::Patch => notes.push("Patch written; review it before applying.".to_string()),
    }

    Ok(ImproveOutcome {
        root: root.display().to_string(),
        mode: options.mode,
        changed_files: edits.changed_files,
        patch_path: written.patch_path,
        report_path: written.report_path,
        notes,
    })
}

fn heuristic_edits(candidates: &[FileEntry], show_progress: bool, cancel: &CancelFlag) -> Result<Vec<Edit>> {
    let engine = TransformEngine::new()?;
    let loader = ContentLoader::default();

    let pb = if show_progress {
        ProgressBar::new(candidates.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("##-"));
    }

    let mut edits = Vec::new();
    for entry in candidates {
        cancel.check()?;
        pb.inc(1);
        pb.set_message(entry.rel.clone());
        let Some(before) = loader.load(&entry.abs) else {
            continue;
        };
        let after = engine.transform(&before);
        if after != before {
            edits.push(Edit {
                rel: entry.rel.clone(),
                abs: entry.abs.clone(),
                before,
                after,
                source: Provenance::Heuristic,
            });
        }
    }
    pb.finish_and_clear();
    Ok(edits)
}

/// The first [`MAX_CANDIDATES`] UI files that load within the provider size limit.
fn provider_candidates(candidates: &[FileEntry]) -> Vec<CandidateFile> {
    let loader = ContentLoader::new(PROVIDER_MAX_BYTES);
    candidates
        .iter()
        .take(MAX_CANDIDATES)
        .filter_map(|entry| {
            loader.load(&entry.abs).map(|text| CandidateFile {
                rel: entry.rel.clone(),
                text,
            })
        })
        .collect()
}

/// Asks the provider for proposals. Failures and timeouts degrade to an empty
/// list with a note; an interrupt aborts the run at once.
async fn request_proposals(
    provider: &dyn EditProvider,
    context: &ProposalContext,
    timeout: Duration,
    cancel: &CancelFlag,
    notes: &mut Vec<String>,
) -> Result<Vec<Proposal>> {
    if context.files.is_empty() {
        return Ok(Vec::new());
    }

    let call = tokio::time::timeout(timeout, provider.propose_edits(context));
    let answer = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        answer = call => answer,
    };

    Ok(match answer {
        Ok(Ok(proposals)) => {
            tracing::info!(count = proposals.len(), "provider proposals received");
            proposals
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "provider failed; continuing with local edits");
            notes.push(format!("External proposals unavailable: {err}"));
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "provider timed out");
            notes.push(format!("External proposals timed out after {}s.", timeout.as_secs()));
            Vec::new()
        }
    })
}

/// Decides which proposals may touch the tree.
///
/// A proposal must name a file this run discovered as a UI candidate.
/// Discovery does not follow symlinks, and the file's resolved location must
/// still be under the resolved root.
struct ProposalGuard<'a> {
    root: PathBuf,
    known: HashMap<&'a str, &'a FileEntry>,
    loader: ContentLoader,
}

impl<'a> ProposalGuard<'a> {
    fn new(root: &Path, candidates: &'a [FileEntry]) -> Self {
        Self {
            root: fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
            known: candidates.iter().map(|entry| (entry.rel.as_str(), entry)).collect(),
            loader: ContentLoader::default(),
        }
    }

    /// Turns a proposal into an edit, or drops it when the path is unknown or
    /// escapes the root, the file is unusable, or the content is unchanged.
    fn resolve(&self, proposal: Proposal) -> Option<Edit> {
        let rel = proposal.path.trim().trim_start_matches("./").replace('\\', "/");
        let Some(entry) = self.known.get(rel.as_str()) else {
            tracing::warn!(path = %proposal.path, "rejecting proposal for a file outside the candidates");
            return None;
        };

        let inside = fs::canonicalize(&entry.abs).is_ok_and(|real| real.starts_with(&self.root));
        if !inside {
            tracing::warn!(path = %proposal.path, "rejecting proposal that resolves outside the project");
            return None;
        }

        let before = self.loader.load(&entry.abs)?;
        if before == proposal.new_content {
            return None;
        }
        Some(Edit {
            rel: entry.rel.clone(),
            abs: entry.abs.clone(),
            before,
            after: proposal.new_content,
            source: Provenance::External,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::discover_files;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const PAGE: &str = "import { cn } from '@/lib/utils'\n\
        \n\
        export default function Page() {\n\
        \x20 return (\n\
        \x20   <main className=\"flex min-h-screen flex-col items-center justify-between p-24 text-zinc-600\">\n\
        \x20     <h1 className=\"text-4xl font-bold\">Hello</h1>  \n\
        \x20   </main>\n\
        \x20 )\n\
        }\n";

    struct StubProvider {
        proposals: Vec<Proposal>,
    }

    #[async_trait]
    impl EditProvider for StubProvider {
        fn describe(&self) -> String {
            "stub".to_string()
        }

        async fn propose_edits(&self, _context: &ProposalContext) -> Result<Vec<Proposal>> {
            Ok(self.proposals.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EditProvider for FailingProvider {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        async fn propose_edits(&self, _context: &ProposalContext) -> Result<Vec<Proposal>> {
            Err(Error::Provider("provider responded with 500".into()))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl EditProvider for SlowProvider {
        fn describe(&self) -> String {
            "slow".to_string()
        }

        async fn propose_edits(&self, _context: &ProposalContext) -> Result<Vec<Proposal>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "src/app/page.tsx", PAGE);
        write(temp_dir.path(), "node_modules/pkg/index.js", "module.exports = 1;   \n");
        temp_dir
    }

    fn options(root: &Path, mode: Mode) -> ImproveOptions {
        ImproveOptions {
            mode,
            ..ImproveOptions::new(root)
        }
    }

    #[test]
    fn test_discovery_skips_node_modules() {
        let temp_dir = project();
        let rels: Vec<String> = discover_files(temp_dir.path(), &DiscoveryOptions::default())
            .unwrap()
            .map(|entry| entry.rel)
            .collect();
        assert_eq!(rels, vec!["src/app/page.tsx"]);
    }

    #[tokio::test]
    async fn test_patch_mode_end_to_end() {
        let temp_dir = project();
        let root = temp_dir.path();

        let outcome = improve_codebase(&options(root, Mode::Patch), None, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);

        let patch = fs::read_to_string(outcome.patch_path.unwrap()).unwrap();
        assert_eq!(patch.matches("\n@@ -1,").count(), 1);
        assert!(patch.contains("diff --git a/src/app/page.tsx b/src/app/page.tsx"));
        assert!(!patch.contains("node_modules"));
        assert!(patch.contains("+    <main className={cn(\"flex min-h-screen"));

        // Sources are untouched in patch mode.
        assert_eq!(fs::read_to_string(root.join("src/app/page.tsx")).unwrap(), PAGE);
        assert!(outcome.report_path.is_file());
    }

    #[tokio::test]
    async fn test_apply_mode_without_provider_writes_heuristic_output() {
        let temp_dir = project();
        let root = temp_dir.path();

        let outcome = improve_codebase(&options(root, Mode::Apply), None, &CancelFlag::new())
            .await
            .unwrap();
        assert!(outcome.patch_path.is_none());
        assert!(outcome.notes.iter().any(|n| n.contains("disabled")));

        let expected = TransformEngine::new().unwrap().transform(PAGE);
        let written = fs::read_to_string(root.join("src/app/page.tsx")).unwrap();
        assert_eq!(written, expected);
        assert!(written.contains("text-neutral-600"));
        assert!(written.contains("text-4xl font-bold text-balance"));
        assert_eq!(
            fs::read_to_string(root.join("node_modules/pkg/index.js")).unwrap(),
            "module.exports = 1;   \n"
        );
    }

    #[tokio::test]
    async fn test_external_proposal_wins() {
        let temp_dir = project();
        let root = temp_dir.path();
        let provider = StubProvider {
            proposals: vec![Proposal {
                path: "src/app/page.tsx".into(),
                new_content: "export default function Page() { return null }\n".into(),
            }],
        };

        let outcome = improve_codebase(&options(root, Mode::Apply), Some(&provider), &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);
        assert_eq!(
            fs::read_to_string(root.join("src/app/page.tsx")).unwrap(),
            "export default function Page() { return null }\n"
        );

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(outcome.report_path).unwrap()).unwrap();
        assert_eq!(report["edits"].as_array().unwrap().len(), 1);
        assert_eq!(report["edits"][0]["source"], "external");
    }

    #[tokio::test]
    async fn test_unsafe_proposals_are_dropped() {
        let temp_dir = project();
        let root = temp_dir.path();
        write(root, "outside.tsx", "x");
        let provider = StubProvider {
            proposals: vec![
                Proposal { path: "../outside.tsx".into(), new_content: "pwned".into() },
                Proposal { path: "node_modules/pkg/index.js".into(), new_content: "pwned".into() },
                Proposal { path: "src/missing.tsx".into(), new_content: "new file".into() },
            ],
        };

        let outcome = improve_codebase(&options(root, Mode::DryRun), Some(&provider), &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);
        assert_eq!(fs::read_to_string(root.join("outside.tsx")).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_local_edits() {
        let temp_dir = project();
        let root = temp_dir.path();

        let outcome = improve_codebase(&options(root, Mode::DryRun), Some(&FailingProvider), &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);
        assert!(outcome.notes.iter().any(|n| n.starts_with("External proposals unavailable")));
        assert_eq!(fs::read_to_string(root.join("src/app/page.tsx")).unwrap(), PAGE);
    }

    #[tokio::test]
    async fn test_provider_timeout_degrades_to_local_edits() {
        let temp_dir = project();
        let root = temp_dir.path();
        let options = ImproveOptions {
            provider_timeout: Duration::from_millis(20),
            ..options(root, Mode::DryRun)
        };

        let outcome = improve_codebase(&options, Some(&SlowProvider), &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);
        assert!(outcome.notes.iter().any(|n| n.contains("timed out")));
    }

    #[tokio::test]
    async fn test_cancelled_run_fails_without_writing() {
        let temp_dir = project();
        let root = temp_dir.path();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = improve_codebase(&options(root, Mode::Apply), None, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(fs::read_to_string(root.join("src/app/page.tsx")).unwrap(), PAGE);
        assert!(!root.join(".designv1").exists());
    }

    #[test]
    fn test_guard_normalizes_known_paths() {
        let temp_dir = project();
        let root = temp_dir.path();
        let candidates: Vec<FileEntry> = discover_files(root, &DiscoveryOptions::default()).unwrap().collect();
        let guard = ProposalGuard::new(root, &candidates);

        let edit = guard
            .resolve(Proposal { path: "./src/app/page.tsx".into(), new_content: "new".into() })
            .unwrap();
        assert_eq!(edit.rel, "src/app/page.tsx");
        assert_eq!(edit.before, PAGE);
        assert_eq!(edit.source, Provenance::External);

        let unchanged = guard.resolve(Proposal { path: "src/app/page.tsx".into(), new_content: PAGE.into() });
        assert!(unchanged.is_none());

        let unknown = guard.resolve(Proposal { path: "src/app/other.tsx".into(), new_content: "x".into() });
        assert!(unknown.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_paths_cannot_escape_the_root() {
        let temp_dir = project();
        let root = temp_dir.path();
        let outside = TempDir::new().unwrap();
        write(outside.path(), "victim.tsx", "keep\n");
        std::os::unix::fs::symlink(outside.path(), root.join("src/link")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("victim.tsx"), root.join("src/alias.tsx")).unwrap();

        let provider = StubProvider {
            proposals: vec![
                Proposal { path: "src/link/victim.tsx".into(), new_content: "pwned".into() },
                Proposal { path: "src/alias.tsx".into(), new_content: "pwned".into() },
            ],
        };
        let outcome = improve_codebase(&options(root, Mode::Apply), Some(&provider), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome.changed_files, vec!["src/app/page.tsx"]);
        assert_eq!(fs::read_to_string(outside.path().join("victim.tsx")).unwrap(), "keep\n");
    }

    #[tokio::test]
    async fn test_interrupt_during_provider_call_fails_fast() {
        let temp_dir = project();
        let root = temp_dir.path();
        let options = ImproveOptions {
            provider_timeout: Duration::from_secs(60),
            ..options(root, Mode::Apply)
        };
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = improve_codebase(&options, Some(&SlowProvider), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(fs::read_to_string(root.join("src/app/page.tsx")).unwrap(), PAGE);
        assert!(!root.join(".designv1").exists());
    }

    #[tokio::test]
    async fn test_summary_count_ignores_default_cap() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let total = DEFAULT_MAX_FILES + 5;
        for i in 0..total {
            write(root, &format!("src/f{i}.ts"), "x  \n");
        }

        let outcome = improve_codebase(&options(root, Mode::DryRun), None, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.changed_files.len(), DEFAULT_MAX_FILES);

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(outcome.report_path).unwrap()).unwrap();
        assert_eq!(report["scan"]["files"]["scanned"], total);

        let capped = ImproveOptions {
            discovery: DiscoveryOptions {
                max_files: Some(3),
                ..Default::default()
            },
            ..options(root, Mode::DryRun)
        };
        let outcome = improve_codebase(&capped, None, &CancelFlag::new()).await.unwrap();
        assert_eq!(outcome.changed_files.len(), 3);
    }
}
