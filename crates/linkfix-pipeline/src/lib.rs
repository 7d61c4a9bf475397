//! Markdown-to-HTML pipeline with link normalization at both stages.
//!
//! `pulldown-cmark` does the parsing and HTML generation. The pipeline
//! exposes two extension points around it:
//!
//! - [`SourceTransform`]: runs on the markdown tree before HTML generation
//! - [`RenderTransform`]: runs on the rendered HTML tree, catching links
//!   that came from raw HTML rather than markdown syntax
//!
//! [`FixDocsLinks`] plugs into both with the same [`LinkPrefixes`], so
//! a link fixed at the source stage is left alone at the render stage.
//!
//! # Example
//!
//! ```
//! use linkfix_links::LinkPrefixes;
//! use linkfix_pipeline::Pipeline;
//!
//! let pipeline = Pipeline::for_prefixes(LinkPrefixes::default());
//! let output = pipeline
//!     .render("[Setup](/guides/setup) and <a href=\"/faq\">FAQ</a>")
//!     .unwrap();
//!
//! assert!(output.html.contains(r#"href="/docs/guides/setup""#));
//! assert!(output.html.contains(r#"href="/docs/faq""#));
//! assert_eq!(output.source.rewritten(), 1);
//! assert_eq!(output.render.rewritten(), 1);
//! ```

mod pipeline;
mod transform;

pub use linkfix_links::{LinkPrefixes, RewriteReport};
pub use pipeline::{HtmlOutput, Pipeline, PipelineError, RenderOutput};
pub use transform::{FixDocsLinks, RenderTransform, SourceTransform};
