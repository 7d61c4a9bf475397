//! linkfix CLI - documentation link normalizer.
//!
//! Provides commands for:
//! - `render`: Render a markdown file with links normalized at both stages
//! - `check`: Report links in markdown files that need the docs prefix
//! - `classify`: Show how link targets are classified
//! - `fix-html`: Normalize links in an already rendered HTML file

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, ClassifyArgs, FixHtmlArgs, RenderArgs};
use output::Output;

/// linkfix - keep documentation links working under a base path.
#[derive(Parser)]
#[command(name = "linkfix", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to HTML.
    Render(RenderArgs),
    /// Report links that need the docs prefix.
    Check(CheckArgs),
    /// Classify link targets.
    Classify(ClassifyArgs),
    /// Normalize links in an HTML file.
    FixHtml(FixHtmlArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.settings.verbose,
            Self::Check(args) => args.settings.verbose,
            Self::Classify(args) => args.settings.verbose,
            Self::FixHtml(args) => args.settings.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Check(args) => args.execute(),
        Commands::Classify(args) => args.execute(),
        Commands::FixHtml(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
