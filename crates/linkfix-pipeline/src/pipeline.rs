//! Render pipeline with source-stage and render-stage transforms.

use linkfix_links::{LinkPrefixes, RewriteReport};
use linkfix_tree::{HtmlNode, HtmlParseError, MdNode, parse_fragment};
use pulldown_cmark::Options;
use tracing::{debug, debug_span};

use crate::transform::{FixDocsLinks, RenderTransform, SourceTransform};

/// Error from running the pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Rendered or supplied HTML could not be parsed into a tree.
    #[error("failed to parse HTML")]
    Html(#[from] HtmlParseError),
}

/// Result of rendering markdown.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    /// Final HTML after both stages.
    pub html: String,
    /// What the source-stage transforms changed.
    pub source: RewriteReport,
    /// What the render-stage transforms changed.
    pub render: RewriteReport,
}

impl RenderOutput {
    /// Total number of rewritten links across both stages.
    #[must_use]
    pub fn rewritten(&self) -> usize {
        self.source.rewritten() + self.render.rewritten()
    }
}

/// Result of running only the render stage over existing HTML.
#[derive(Clone, Debug)]
pub struct HtmlOutput {
    /// HTML after the render-stage transforms.
    pub html: String,
    /// What the render-stage transforms changed.
    pub report: RewriteReport,
}

/// Markdown-to-HTML pipeline.
///
/// Transforms are applied in registration order at their stage.
pub struct Pipeline {
    gfm: bool,
    source_transforms: Vec<Box<dyn SourceTransform>>,
    render_transforms: Vec<Box<dyn RenderTransform>>,
}

impl Pipeline {
    /// Create a pipeline with GFM enabled and no transforms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gfm: true,
            source_transforms: Vec::new(),
            render_transforms: Vec::new(),
        }
    }

    /// Create a pipeline with [`FixDocsLinks`] registered at both stages.
    #[must_use]
    pub fn for_prefixes(prefixes: LinkPrefixes) -> Self {
        let plugin = FixDocsLinks::new(prefixes);
        Self::new()
            .with_source_transform(plugin.clone())
            .with_render_transform(plugin)
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default. When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    /// - Footnotes and alerts
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Register a transform for the markdown tree.
    #[must_use]
    pub fn with_source_transform(mut self, transform: impl SourceTransform + 'static) -> Self {
        self.source_transforms.push(Box::new(transform));
        self
    }

    /// Register a transform for the rendered HTML tree.
    #[must_use]
    pub fn with_render_transform(mut self, transform: impl RenderTransform + 'static) -> Self {
        self.render_transforms.push(Box::new(transform));
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown to HTML, running both stages.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendered HTML cannot be parsed back into a
    /// tree (for example malformed raw HTML in the source).
    pub fn render(&self, markdown: &str) -> Result<RenderOutput, PipelineError> {
        let mut tree = MdNode::parse(markdown, self.parser_options());
        let source = self.apply_source(&mut tree);

        let HtmlOutput { html, report } = self.fix_html(&tree.to_html())?;

        debug!(
            source_rewrites = source.rewritten(),
            render_rewrites = report.rewritten(),
            "Rendered document"
        );

        Ok(RenderOutput {
            html,
            source,
            render: report,
        })
    }

    /// Run only the source stage and report what it would rewrite.
    pub fn source_rewrites(&self, markdown: &str) -> RewriteReport {
        let mut tree = MdNode::parse(markdown, self.parser_options());
        self.apply_source(&mut tree)
    }

    /// Run only the render stage over an existing HTML document or fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if `html` cannot be parsed into a tree.
    pub fn fix_html(&self, html: &str) -> Result<HtmlOutput, PipelineError> {
        let mut tree = parse_fragment(html)?;
        let report = self.apply_render(&mut tree);
        Ok(HtmlOutput {
            html: tree.to_html(),
            report,
        })
    }

    /// Apply source-stage transforms in registration order.
    pub fn apply_source(&self, tree: &mut MdNode) -> RewriteReport {
        let _span = debug_span!("source_stage").entered();
        let mut report = RewriteReport::default();
        for transform in &self.source_transforms {
            let result = transform.apply(tree);
            debug!(
                transform = transform.name(),
                links = result.links,
                rewritten = result.rewritten(),
                "Applied transform"
            );
            report.merge(result);
        }
        report
    }

    /// Apply render-stage transforms in registration order.
    pub fn apply_render(&self, tree: &mut HtmlNode) -> RewriteReport {
        let _span = debug_span!("render_stage").entered();
        let mut report = RewriteReport::default();
        for transform in &self.render_transforms {
            let result = transform.apply(tree);
            debug!(
                transform = transform.name(),
                links = result.links,
                rewritten = result.rewritten(),
                "Applied transform"
            );
            report.merge(result);
        }
        report
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::for_prefixes(LinkPrefixes::default())
    }

    #[test]
    fn test_render_rewrites_markdown_links() {
        let output = pipeline()
            .render("See [setup](/guides/setup) or [home](https://example.com).")
            .unwrap();
        assert_eq!(
            output.html,
            "<p>See <a href=\"/docs/guides/setup\">setup</a> or <a href=\"https://example.com\">home</a>.</p>\n"
        );
        assert_eq!(output.source.links, 2);
        assert_eq!(output.source.rewritten(), 1);
    }

    #[test]
    fn test_render_stage_adds_nothing_after_source_stage() {
        let markdown = "\
# Guide

- [a](/a)
- [b](/docs/b)
- [c](#c)
- [d](@site/static/d.pdf)
- [e](relative/e)
- [f](mailto:team@example.com)

| Link |
|------|
| [g](/g) |
";
        let output = pipeline().render(markdown).unwrap();
        assert_eq!(output.source.rewritten(), 2);
        assert_eq!(output.render.links, 7);
        assert!(output.render.is_unchanged());
    }

    #[test]
    fn test_render_stage_catches_raw_html_links() {
        let markdown = "\
Inline <a href=\"/inline\">link</a>.

<div class=\"card\">
<a href=\"/card\">Card</a>
<a href=\"/docs/already\">Done</a>
</div>
";
        let output = pipeline().render(markdown).unwrap();
        assert_eq!(output.source.links, 0);
        assert_eq!(output.render.rewritten(), 2);
        assert!(output.html.contains(r#"<a href="/docs/inline">link</a>"#));
        assert!(output.html.contains(r#"<a href="/docs/card">Card</a>"#));
        assert!(output.html.contains(r#"<a href="/docs/already">Done</a>"#));
        assert_eq!(output.rewritten(), 2);
    }

    #[test]
    fn test_script_and_style_blocks_pass_through() {
        let markdown = "\
<script>if (a < b) { x(); }</script>

<style>
a > b { color: red }
</style>

[a](/a)
";
        let output = pipeline().render(markdown).unwrap();
        assert_eq!(
            output.html,
            "<script>if (a < b) { x(); }</script>\n<style>\na > b { color: red }\n</style>\n\
             <p><a href=\"/docs/a\">a</a></p>\n"
        );
        assert_eq!(output.render.links, 1);
    }

    #[test]
    fn test_raw_html_with_stray_less_than() {
        let output = pipeline()
            .render("<div>\n1 < 2 <a href=\"/x\">x</a>\n</div>\n")
            .unwrap();
        assert_eq!(output.html, "<div>\n1 < 2 <a href=\"/docs/x\">x</a>\n</div>\n");
        assert_eq!(output.render.rewritten(), 1);
    }

    #[test]
    fn test_raw_html_with_bare_ampersand() {
        let output = pipeline().render("<div>AT&T</div>\n\n[a](/a)\n").unwrap();
        assert_eq!(
            output.html,
            "<div>AT&T</div>\n<p><a href=\"/docs/a\">a</a></p>\n"
        );
    }

    #[test]
    fn test_processing_instruction_survives_render() {
        let output = pipeline().render("<?php echo 1; ?>\n\n[a](/a)\n").unwrap();
        assert_eq!(
            output.html,
            "<?php echo 1; ?>\n<p><a href=\"/docs/a\">a</a></p>\n"
        );
    }

    #[test]
    fn test_deeply_nested_markdown() {
        let depth = 20_000;
        let markdown = format!("{}[a](/a)", ">".repeat(depth));
        let output = pipeline().render(&markdown).unwrap();
        assert_eq!(output.source.rewritten(), 1);
        assert!(output.render.is_unchanged());
        assert!(output.html.contains("<p><a href=\"/docs/a\">a</a></p>"));
        assert!(output.html.starts_with("<blockquote>\n<blockquote>\n"));
    }

    #[test]
    fn test_fix_html_deeply_nested() {
        let depth = 100_000;
        let html = format!("{}<a href=\"/a\">a</a>", "<div>".repeat(depth));
        let output = pipeline().fix_html(&html).unwrap();
        assert_eq!(output.report.rewritten(), 1);
        assert!(output.html.ends_with("<a href=\"/docs/a\">a</a></div></div>"));
    }

    #[test]
    fn test_fix_html_leaves_script_contents() {
        let html = "<script>document.write('<a href=\"/x\">x</a>');</script><a href=\"/y\">y</a>";
        let output = pipeline().fix_html(html).unwrap();
        assert_eq!(
            output.html,
            "<script>document.write('<a href=\"/x\">x</a>');</script><a href=\"/docs/y\">y</a>"
        );
    }

    #[test]
    fn test_alias_marker_survives_render_stage() {
        let output = pipeline()
            .render("<a href=\"@site/static/file.pdf\">file</a>")
            .unwrap();
        assert!(output.render.is_unchanged());
        assert!(output.html.contains(r#"href="@site/static/file.pdf""#));
    }

    #[test]
    fn test_images_untouched() {
        let output = pipeline().render("![logo](/img/logo.png)").unwrap();
        assert_eq!(output.html, "<p><img src=\"/img/logo.png\" alt=\"logo\" /></p>\n");
        assert_eq!(output.rewritten(), 0);
    }

    #[test]
    fn test_pipeline_without_transforms_renders_verbatim() {
        let output = Pipeline::new().render("[a](/a)").unwrap();
        assert_eq!(output.html, "<p><a href=\"/a\">a</a></p>\n");
        assert_eq!(output.source, RewriteReport::default());
        assert_eq!(output.render, RewriteReport::default());
    }

    #[test]
    fn test_custom_prefix() {
        let output = Pipeline::for_prefixes(LinkPrefixes::new("/handbook/", "@site/"))
            .render("[a](/a) <a href=\"/b\">b</a>")
            .unwrap();
        assert!(output.html.contains(r#"href="/handbook/a""#));
        assert!(output.html.contains(r#"href="/handbook/b""#));
    }

    #[test]
    fn test_gfm_disabled_leaves_tables_as_text() {
        let markdown = "| a |\n|---|\n| [x](/x) |\n";
        let output = pipeline().with_gfm(false).render(markdown).unwrap();
        assert!(!output.html.contains("<table>"));
        assert!(output.html.contains(r#"href="/docs/x""#));
    }

    #[test]
    fn test_source_rewrites_reports_without_rendering() {
        let report = pipeline().source_rewrites("[a](/a) [b](/b) [c](/docs/c)");
        assert_eq!(report.links, 3);
        assert_eq!(
            report
                .rewrites
                .iter()
                .map(|r| r.to.as_str())
                .collect::<Vec<_>>(),
            vec!["/docs/a", "/docs/b"]
        );
    }

    #[test]
    fn test_fix_html_document() {
        let html = "<!DOCTYPE html><html><body><nav><a href=\"/\">Home</a></nav></body></html>";
        let output = pipeline().fix_html(html).unwrap();
        assert_eq!(
            output.html,
            "<!DOCTYPE html><html><body><nav><a href=\"/docs/\">Home</a></nav></body></html>"
        );
        assert_eq!(output.report.rewritten(), 1);
    }

    #[test]
    fn test_fix_html_twice_is_idempotent() {
        let first = pipeline().fix_html("<a href=\"/x\">x</a>").unwrap();
        let second = pipeline().fix_html(&first.html).unwrap();
        assert!(second.report.is_unchanged());
        assert_eq!(second.html, first.html);
    }

    struct CountingTransform;

    impl SourceTransform for CountingTransform {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply(&self, tree: &mut MdNode) -> RewriteReport {
            RewriteReport {
                links: tree.links().len(),
                rewrites: Vec::new(),
            }
        }
    }

    #[test]
    fn test_transforms_run_in_order_and_merge() {
        let pipeline = pipeline().with_source_transform(CountingTransform);
        let output = pipeline.render("[a](/a)").unwrap();
        // FixDocsLinks visits one link, then the counter sees the same link.
        assert_eq!(output.source.links, 2);
        assert_eq!(output.source.rewritten(), 1);
    }
}
