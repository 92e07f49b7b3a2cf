//! Lightweight project summary: what was found and which UI stack it looks like.
//!
//! The summary is printed by `scan`, embedded in every improve report and sent
//! along with files to the edit provider as context.

use crate::cancel::CancelFlag;
use crate::errors::Result;
use crate::loader::ContentLoader;
use crate::scanner::{Discovery, DiscoveryOptions};
use crate::transform::is_ui_source;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// File counts for a discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounts {
    pub scanned: usize,
    pub ui: usize,
}

/// The discovery summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub root: String,
    pub stack: Vec<String>,
    pub files: FileCounts,
    pub findings: Vec<String>,
}

struct Signals {
    class_attr: Regex,
    spacing_utility: Regex,
    shadcn_import: Regex,
}

impl Signals {
    fn new() -> Result<Self> {
        Ok(Self {
            class_attr: Regex::new(r#"\bclass(Name)?\s*=\s*["'`]|\bclassName\s*:\s*["'`]"#)?,
            spacing_utility: Regex::new(r"\b(p|m|px|py|pt|pb|pl|pr|gap|space-[xy])-\d")?,
            shadcn_import: Regex::new(r#"from\s+['"]@/components/ui/|components/ui/button"#)?,
        })
    }

    fn has_tailwind(&self, text: &str) -> bool {
        self.class_attr.is_match(text) && self.spacing_utility.is_match(text)
    }
}

/// Walks `root` and builds a [`ScanSummary`].
pub fn summarize(root: &Path, options: &DiscoveryOptions, cancel: &CancelFlag) -> Result<ScanSummary> {
    let discovery = Discovery::new(root, options)?.with_cancel(cancel.clone());
    let root = discovery.root().to_path_buf();
    let loader = ContentLoader::default();
    let signals = Signals::new()?;

    let mut files = FileCounts::default();
    let mut has_tailwind = false;
    let mut has_shadcn = false;

    for entry in discovery {
        files.scanned += 1;
        if !is_ui_source(&entry.rel) {
            continue;
        }
        files.ui += 1;
        let Some(text) = loader.load(&entry.abs) else {
            continue;
        };
        has_tailwind = has_tailwind || signals.has_tailwind(&text);
        has_shadcn = has_shadcn || signals.shadcn_import.is_match(&text);
    }
    cancel.check()?;

    let mut stack = detect_stack(read_package_json(&root).as_ref());
    if root.join("app").exists() {
        stack.push("Next.js App Router (app/)".to_string());
    }
    if root.join("pages").exists() {
        stack.push("Next.js Pages Router (pages/)".to_string());
    }
    if has_tailwind && !mentions(&stack, "tailwind") {
        stack.push("Tailwind CSS (class heuristics)".to_string());
    }
    if has_shadcn && !mentions(&stack, "shadcn") {
        stack.push("shadcn/ui (import heuristics)".to_string());
    }
    dedup_in_order(&mut stack);

    let mut findings = vec![
        if has_tailwind {
            "Tailwind classes detected in UI files."
        } else {
            "No obvious Tailwind class usage detected (could still be present via helpers)."
        }
        .to_string(),
        if has_shadcn {
            "shadcn/ui-style imports detected."
        } else {
            "No obvious shadcn/ui imports detected."
        }
        .to_string(),
    ];
    if files.ui == 0 {
        findings.push("No UI-source files found (.tsx/.jsx/.mdx).".to_string());
    }

    tracing::info!(scanned = files.scanned, ui = files.ui, "scan complete");

    Ok(ScanSummary {
        root: root.display().to_string(),
        stack,
        files,
        findings,
    })
}

fn read_package_json(root: &Path) -> Option<Value> {
    let raw = fs::read_to_string(root.join("package.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Simple key lookups over `dependencies` and `devDependencies`.
fn detect_stack(package: Option<&Value>) -> Vec<String> {
    let dep = |name: &str| -> Option<String> {
        let package = package?;
        ["dependencies", "devDependencies"]
            .iter()
            .filter_map(|section| package.get(*section)?.get(name))
            .find_map(|version| version.as_str().map(str::to_string))
    };

    let mut stack = Vec::new();
    if let Some(v) = dep("next") {
        stack.push(format!("Next.js ({v})"));
    }
    if let Some(v) = dep("react") {
        stack.push(format!("React ({v})"));
    }
    if let Some(v) = dep("tailwindcss") {
        stack.push(format!("Tailwind CSS ({v})"));
    }
    if dep("@radix-ui/react-dialog").is_some() || dep("@radix-ui/react-dropdown-menu").is_some() {
        stack.push("Radix UI (deps)".to_string());
    }
    if dep("class-variance-authority").is_some() {
        stack.push("class-variance-authority (cva)".to_string());
    }
    if dep("tailwind-merge").is_some() || dep("clsx").is_some() {
        stack.push("Classname helpers (clsx/twMerge)".to_string());
    }
    stack
}

fn mentions(stack: &[String], needle: &str) -> bool {
    stack.iter().any(|s| s.to_lowercase().contains(needle))
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
