//! `linkfix check` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use linkfix_links::RewriteReport;
use tracing::{info, warn};

use super::{SettingsArgs, pipeline};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Markdown files or directories to scan (default: current directory).
    paths: Vec<PathBuf>,

    /// Exit with an error when any link needs the docs prefix.
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Links the source stage would rewrite in one file.
#[derive(Debug)]
pub(crate) struct FileFindings {
    pub path: PathBuf,
    pub report: RewriteReport,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a file cannot be read, or
    /// `--strict` is set and any link needs the docs prefix.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.settings.load(None)?;
        let pipeline = pipeline(&config);

        let roots = if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        };
        let files = collect_markdown(&roots);
        info!(files = files.len(), "Scanning markdown files");

        let mut findings = Vec::new();
        for path in files {
            let markdown = fs::read_to_string(&path)?;
            let report = pipeline.source_rewrites(&markdown);
            if !report.is_unchanged() {
                findings.push(FileFindings { path, report });
            }
        }

        let total: usize = findings.iter().map(|f| f.report.rewritten()).sum();
        for finding in &findings {
            output.warning(&finding.path.display().to_string());
            for rewrite in &finding.report.rewrites {
                output.muted(&format!("  {} -> {}", rewrite.from, rewrite.to));
            }
        }

        if total == 0 {
            output.success("All links are canonical");
            return Ok(());
        }

        output.info(&format!(
            "{total} link(s) in {} file(s) need the docs prefix",
            findings.len()
        ));
        if self.strict {
            return Err(CliError::LinksNeedPrefix(total));
        }
        Ok(())
    }
}

/// Collect markdown files under `roots`, sorted for stable output.
///
/// Directories are walked recursively, skipping hidden entries. Explicit file
/// arguments are kept whatever their extension.
pub(crate) fn collect_markdown(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            walk(root, &mut files);
        } else if root.is_file() {
            files.push(root.clone());
        } else {
            warn!(path = %root.display(), "Path does not exist");
        }
    }
    files.sort();
    files.dedup();
    files
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            walk(&path, files);
        } else if is_markdown(&path) {
            files.push(path);
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("mdx"))
}
