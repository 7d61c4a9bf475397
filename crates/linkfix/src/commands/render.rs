//! `linkfix render` command implementation.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{SettingsArgs, pipeline};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    file: PathBuf,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable GitHub Flavored Markdown extensions.
    #[arg(long)]
    no_gfm: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the file cannot be read or
    /// written, or the rendered HTML cannot be parsed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.settings.load(self.no_gfm.then_some(false))?;

        let markdown = std::fs::read_to_string(&self.file)?;
        let rendered = pipeline(&config).render(&markdown)?;
        info!(
            path = %self.file.display(),
            source_rewrites = rendered.source.rewritten(),
            render_rewrites = rendered.render.rewritten(),
            "Rendered markdown"
        );

        match &self.output {
            Some(path) => {
                std::fs::write(path, &rendered.html)?;
                output.success(&format!(
                    "Wrote {} ({} link(s) rewritten)",
                    path.display(),
                    rendered.rewritten()
                ));
            }
            None => output.data(&rendered.html),
        }

        Ok(())
    }
}
