use crate::config::ProjectConfig;
use crate::output_writer::Mode;
use crate::scanner::DiscoveryOptions;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// UI polish agent for codebases.
///
/// `designv1` walks a web project, applies a handful of conservative styling
/// fixes to UI sources and, when an API key is configured, folds in whole-file
/// proposals from an external model. Results land in a patch by default.
#[derive(Parser, Debug)]
#[command(
    name = "designv1",
    author,
    version,
    about = "UI polish agent for codebases",
    long_about = "designv1 - A UI polish agent for web codebases.

Applies conservative, idempotent styling fixes:
  • zinc → neutral color tokens
  • text-balance on large headings
  • cn() around long className literals
  • trailing whitespace cleanup

QUICK EXAMPLES:
  designv1 scan                       # Summarize the current project
  designv1 scan --json | jq .stack    # Machine-readable summary
  designv1 improve                    # Write a patch to .designv1/patches
  designv1 improve --apply            # Edit files in place
  designv1 improve --dry-run          # Report only, write nothing else

If OPENAI_API_KEY is set, improve also asks a model for edits.
For detailed help on any command, use: designv1 <command> --help"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Discovery flags shared by both commands.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct DiscoveryArgs {
    /// Stop after this many eligible files.
    #[arg(long = "max-files", value_name = "N")]
    pub max_files: Option<usize>,

    /// Only consider files matching this glob (e.g. `src/**`).
    #[arg(long, value_name = "GLOB")]
    pub include: Option<String>,

    /// Skip files matching this glob, on top of the built-in ignores.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Option<String>,

    /// Project root. Defaults to the current directory.
    #[arg(default_value = ".")]
    pub root: PathBuf,
}

impl DiscoveryArgs {
    /// Flags first, then the project file.
    pub fn resolve(&self, config: &ProjectConfig) -> DiscoveryOptions {
        DiscoveryOptions {
            max_files: self.max_files.or(config.max_files),
            include: self.include.clone().or_else(|| config.include.clone()),
            exclude: self.exclude.clone().or_else(|| config.exclude.clone()),
        }
    }
}

/// The set of available commands for the `designv1` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize the project: file counts, detected stack, findings
    ///
    /// EXAMPLES:
    ///   designv1 scan
    ///   designv1 scan --include 'src/**' --json
    ///   designv1 scan ../web --max-files 200
    Scan {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Polish UI sources and write a patch, a report, or the files themselves
    ///
    /// EXAMPLES:
    ///   designv1 improve                          # Patch mode (default)
    ///   designv1 improve --apply                  # Write edits in place
    ///   designv1 improve --dry-run --json         # Report only
    ///   designv1 improve --instructions 'Prefer 8px spacing steps'
    ///
    /// Without --apply, improve writes a patch to .designv1/patches.
    Improve {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Overwrite source files in place.
        #[arg(long, conflicts_with = "dry_run")]
        apply: bool,

        /// Compute edits and write the report only.
        #[arg(long = "dry-run")]
        dry_run: bool,

        /// Model used for external proposals.
        #[arg(long, env = "DESIGNV1_MODEL")]
        model: Option<String>,

        /// Free-text guidance passed to the model.
        #[arg(long, visible_alias = "instruction", value_name = "TEXT")]
        instructions: Option<String>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn mode(&self) -> Option<Mode> {
        match self {
            Commands::Improve { apply, dry_run, .. } => Some(Mode::from_flags(*apply, *dry_run)),
            Commands::Scan { .. } => None,
        }
    }
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
