//! CLI error types.

use linkfix_config::ConfigError;
use linkfix_pipeline::PipelineError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0} link(s) need the docs prefix")]
    LinksNeedPrefix(usize),
}
