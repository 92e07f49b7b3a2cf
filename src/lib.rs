//! `designv1` is a library for polishing the UI layer of web codebases.
//!
//! It provides the core logic for the `designv1` command-line tool but can also be
//! used as a standalone library. The main components are:
//!
//! - `scanner`: Gitignore-free project discovery with built-in ignores, include and
//!   exclude globs, and a file cap.
//! - `transform`: The conservative, idempotent styling rules applied to UI sources.
//! - `provider`: The seam for externally proposed whole-file edits, with an
//!   OpenAI-style HTTP implementation.
//! - `edits`: Merging heuristic and external edits into one final set.
//! - `patch` and `output_writer`: Committing that set as a patch, in place, or as
//!   a report only.
//! - `config`: Process settings and optional per-project YAML defaults.
//!
//! `improve::improve_codebase` ties the pieces together.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod edits;
pub mod errors;
pub mod fingerprint;
pub mod improve;
pub mod loader;
pub mod output_formatter;
pub mod output_writer;
pub mod patch;
pub mod patterns;
pub mod provider;
pub mod scanner;
pub mod state_manager;
pub mod summary;
pub mod transform;

// Re-export main types for easier access by library users.
pub use cancel::CancelFlag;
pub use config::{ConfigLoader, ProjectConfig, Settings};
pub use edits::{Edit, EditCollector, EditSet, Provenance};
pub use errors::{Error, Result};
pub use improve::{ImproveOptions, ImproveOutcome, improve_codebase};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use output_writer::{Mode, OutputWriter, Report};
pub use patch::PatchDocument;
pub use provider::{EditProvider, OpenAiProvider};
pub use scanner::{Discovery, DiscoveryOptions, FileEntry};
pub use state_manager::StateManager;
pub use summary::{ScanSummary, summarize};
pub use transform::TransformEngine;
