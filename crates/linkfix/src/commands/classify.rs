//! `linkfix classify` command implementation.

use clap::Args;
use linkfix_links::LinkPrefixes;

use super::{SettingsArgs, prefixes};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the classify command.
#[derive(Args)]
pub(crate) struct ClassifyArgs {
    /// Link targets to classify.
    #[arg(required = true)]
    targets: Vec<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl ClassifyArgs {
    /// Execute the classify command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.settings.load(None)?;
        let prefixes = prefixes(&config);

        for target in &self.targets {
            output.data_line(&describe(&prefixes, target));
        }
        Ok(())
    }
}

/// One tab-separated line: target, class, and the rewritten target if any.
fn describe(prefixes: &LinkPrefixes, target: &str) -> String {
    let class = prefixes.classify(target);
    match prefixes.rewrite(target) {
        Some(rewritten) => format!("{target}\t{class}\t{rewritten}"),
        None => format!("{target}\t{class}"),
    }
}
