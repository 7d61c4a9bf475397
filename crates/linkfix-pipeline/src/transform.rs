//! Pipeline extension points and the link-fixing plugin.

use linkfix_links::{LinkPrefixes, RewriteReport, rewrite_links};
use linkfix_tree::{HtmlNode, MdNode};

/// Transform applied to the markdown tree before HTML generation.
pub trait SourceTransform {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Mutate the tree in place and report what changed.
    fn apply(&self, tree: &mut MdNode) -> RewriteReport;
}

/// Transform applied to the rendered HTML tree.
pub trait RenderTransform {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Mutate the tree in place and report what changed.
    fn apply(&self, tree: &mut HtmlNode) -> RewriteReport;
}

/// Prepends the docs prefix to root-relative links at either stage.
#[derive(Clone, Debug, Default)]
pub struct FixDocsLinks {
    prefixes: LinkPrefixes,
}

impl FixDocsLinks {
    /// Create the plugin for a deployment's prefixes.
    #[must_use]
    pub fn new(prefixes: LinkPrefixes) -> Self {
        Self { prefixes }
    }

    /// Prefixes this plugin rewrites with.
    #[must_use]
    pub fn prefixes(&self) -> &LinkPrefixes {
        &self.prefixes
    }
}

impl SourceTransform for FixDocsLinks {
    fn name(&self) -> &'static str {
        "fix-docs-links"
    }

    fn apply(&self, tree: &mut MdNode) -> RewriteReport {
        rewrite_links(tree, &self.prefixes)
    }
}

impl RenderTransform for FixDocsLinks {
    fn name(&self) -> &'static str {
        "fix-docs-links"
    }

    fn apply(&self, tree: &mut HtmlNode) -> RewriteReport {
        rewrite_links(tree, &self.prefixes)
    }
}
