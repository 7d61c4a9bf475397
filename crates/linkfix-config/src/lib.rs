//! Configuration management for linkfix.
//!
//! Parses `linkfix.toml` with serde and discovers it in the current directory
//! or its parents. CLI settings are applied on top via [`CliSettings`].
//!
//! ```toml
//! [links]
//! docs_prefix = "/docs/"
//! alias_marker = "@site/"
//!
//! [render]
//! gfm = true
//! ```
//!
//! ## Environment Variable Expansion
//!
//! Both `links` fields support `${VAR}` and `${VAR:-default}`, so one config
//! can serve deployments with different base paths.

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::expand::expand_env;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "linkfix.toml";

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the canonical docs prefix.
    pub docs_prefix: Option<String>,
    /// Override the alias marker.
    pub alias_marker: Option<String>,
    /// Override GitHub Flavored Markdown parsing.
    pub gfm: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Link rewriting configuration.
    pub links: LinksConfig,
    /// Markdown rendering configuration.
    pub render: RenderConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Link rewriting configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Prefix every root-relative docs link must carry (e.g. `/docs/`).
    pub docs_prefix: String,
    /// Marker for targets the site generator resolves itself (e.g. `@site/`).
    pub alias_marker: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            docs_prefix: "/docs/".to_owned(),
            alias_marker: "@site/".to_owned(),
        }
    }
}

/// Markdown rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Whether GitHub Flavored Markdown extensions are enabled.
    pub gfm: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`links.docs_prefix`").
        field: String,
        /// Error message (e.g., "${`DOCS_BASE`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise, searches
    /// for `linkfix.toml` in the current directory and its parents, falling
    /// back to defaults.
    ///
    /// CLI settings are applied after loading and take precedence.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or the resulting values are invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let discovered = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| Self::discover_from(&cwd)),
        };

        let mut config = match discovered {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Search for the config file in `start` and its parents.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(docs_prefix) = &settings.docs_prefix {
            self.links.docs_prefix.clone_from(docs_prefix);
        }
        if let Some(alias_marker) = &settings.alias_marker {
            self.links.alias_marker.clone_from(alias_marker);
        }
        if let Some(gfm) = settings.gfm {
            self.render.gfm = gfm;
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.links.docs_prefix = expand_env(&self.links.docs_prefix, "links.docs_prefix")?;
        self.links.alias_marker = expand_env(&self.links.alias_marker, "links.alias_marker")?;
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.links.validate()
    }
}

impl LinksConfig {
    /// Validate link settings.
    ///
    /// The docs prefix must be a `/`-delimited path segment other than `/`.
    /// The alias marker must be non-empty and must not start with `/` or `#`,
    /// which would make it shadow ordinary paths or anchors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.docs_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "links.docs_prefix must start and end with '/', got {prefix:?}"
            )));
        }
        if prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "links.docs_prefix cannot be the site root".into(),
            ));
        }
        let marker = &self.alias_marker;
        if marker.is_empty() {
            return Err(ConfigError::Validation(
                "links.alias_marker cannot be empty".into(),
            ));
        }
        if marker.starts_with('/') || marker.starts_with('#') {
            return Err(ConfigError::Validation(format!(
                "links.alias_marker must not start with '/' or '#', got {marker:?}"
            )));
        }
        Ok(())
    }
}
