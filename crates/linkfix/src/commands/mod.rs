//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod classify;
pub(crate) mod fix_html;
pub(crate) mod render;

use std::path::PathBuf;

use clap::Args;
use linkfix_config::{CliSettings, Config};
use linkfix_links::LinkPrefixes;
use linkfix_pipeline::Pipeline;

use crate::error::CliError;

pub(crate) use check::CheckArgs;
pub(crate) use classify::ClassifyArgs;
pub(crate) use fix_html::FixHtmlArgs;
pub(crate) use render::RenderArgs;

/// Settings shared by every command.
#[derive(Args, Debug, Default)]
pub(crate) struct SettingsArgs {
    /// Path to configuration file (default: auto-discover linkfix.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Canonical docs prefix (overrides config).
    #[arg(long, env = "LINKFIX_DOCS_PREFIX")]
    docs_prefix: Option<String>,

    /// Alias marker left for the site generator (overrides config).
    #[arg(long)]
    alias_marker: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SettingsArgs {
    /// Load configuration with these settings applied.
    pub(crate) fn load(&self, gfm: Option<bool>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            docs_prefix: self.docs_prefix.clone(),
            alias_marker: self.alias_marker.clone(),
            gfm,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Link prefixes from loaded configuration.
pub(crate) fn prefixes(config: &Config) -> LinkPrefixes {
    LinkPrefixes::new(&config.links.docs_prefix, config.links.alias_marker.as_str())
}

/// Pipeline with link fixing registered at both stages.
pub(crate) fn pipeline(config: &Config) -> Pipeline {
    Pipeline::for_prefixes(prefixes(config)).with_gfm(config.render.gfm)
}
