//! `linkfix fix-html` command implementation.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{SettingsArgs, pipeline};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the fix-html command.
#[derive(Args)]
pub(crate) struct FixHtmlArgs {
    /// HTML file to fix in place.
    file: PathBuf,

    /// Report rewrites without writing the file.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl FixHtmlArgs {
    /// Execute the fix-html command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the file cannot be read or
    /// written, or its HTML cannot be parsed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.settings.load(None)?;

        let html = std::fs::read_to_string(&self.file)?;
        let fixed = pipeline(&config).fix_html(&html)?;
        info!(
            path = %self.file.display(),
            links = fixed.report.links,
            rewritten = fixed.report.rewritten(),
            "Fixed HTML links"
        );

        for rewrite in &fixed.report.rewrites {
            output.muted(&format!("  {} -> {}", rewrite.from, rewrite.to));
        }

        if fixed.report.is_unchanged() {
            output.success("No links to fix");
        } else if self.dry_run {
            output.info(&format!(
                "{} link(s) would be rewritten",
                fixed.report.rewritten()
            ));
        } else {
            std::fs::write(&self.file, &fixed.html)?;
            output.success(&format!(
                "Rewrote {} link(s) in {}",
                fixed.report.rewritten(),
                self.file.display()
            ));
        }

        Ok(())
    }
}
