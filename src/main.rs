//! The main entry point for the `designv1` command-line application.
//!
//! This file is responsible for parsing command-line arguments, installing
//! logging and the Ctrl-C handler, and dispatching to the `designv1` library.

use anyhow::Context;
use designv1::cli::{self, Commands};
use designv1::improve::{self, ImproveOptions};
use designv1::provider::{EditProvider, OpenAiProvider};
use designv1::{CancelFlag, ConfigLoader, OutputFormat, OutputFormatter, Settings, summarize};
use std::env;
use std::io::{self, IsTerminal};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("designv1=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_quick_start() {
    println!("DesignV1 - UI polish agent for codebases\n");
    println!("QUICK START EXAMPLES:");
    println!("  designv1 scan                        # Summarize the current project");
    println!("  designv1 scan --json                 # Same, as JSON");
    println!("  designv1 improve                     # Write a patch to .designv1/patches");
    println!("  designv1 improve --apply             # Edit files in place");
    println!("  designv1 improve --dry-run           # Report only\n");
    println!("Set OPENAI_API_KEY to let improve ask a model for edits.");
    println!("Run 'designv1 --help' for full command list");
    println!("Run 'designv1 <command> --help' for detailed command help");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    if env::args().len() == 1 {
        print_quick_start();
        return Ok(());
    }

    let args = cli::parse_args();
    let Some(command) = args.command else {
        print_quick_start();
        return Ok(());
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; stopping before the next write");
                cancel.cancel();
            }
        });
    }

    let mode = command.mode().unwrap_or_default();
    match command {
        Commands::Scan { discovery, json } => {
            let config = ConfigLoader::load_for_root(&discovery.root)
                .with_context(|| format!("loading project config for {}", discovery.root.display()))?;
            let options = discovery.resolve(&config);
            let summary = summarize(&discovery.root, &options, &cancel)
                .with_context(|| format!("scanning {}", discovery.root.display()))?;
            OutputFormatter::new(OutputFormat::from_json_flag(json)).write_scan(&mut io::stdout().lock(), &summary)?;
        }
        Commands::Improve {
            discovery,
            model,
            instructions,
            json,
            ..
        } => {
            let config = ConfigLoader::load_for_root(&discovery.root)
                .with_context(|| format!("loading project config for {}", discovery.root.display()))?;

            let mut settings = Settings::from_env();
            if let Some(model) = model.or_else(|| config.model.clone()) {
                settings.model = model;
            }

            let options = ImproveOptions {
                root: discovery.root.clone(),
                mode,
                discovery: discovery.resolve(&config),
                instructions: instructions.or_else(|| config.instructions.clone()),
                provider_timeout: Duration::from_secs(settings.timeout_secs),
                show_progress: !json && io::stderr().is_terminal(),
            };

            let provider = OpenAiProvider::from_settings(&settings).context("building the edit provider")?;
            let provider = provider.as_ref().map(|p| p as &dyn EditProvider);

            let outcome = improve::improve_codebase(&options, provider, &cancel)
                .await
                .with_context(|| format!("improving {}", discovery.root.display()))?;
            OutputFormatter::new(OutputFormat::from_json_flag(json)).write_improve(&mut io::stdout().lock(), &outcome)?;
        }
    }

    Ok(())
}
