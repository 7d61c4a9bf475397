//! Document trees for link rewriting.
//!
//! Two tree shapes, one per pipeline stage:
//!
//! - [`MdNode`]: owned markdown tree built from `pulldown-cmark` events and
//!   flattened back into events for HTML generation
//! - [`HtmlNode`]: HTML fragment tree parsed leniently with `quick-xml`
//!
//! Both implement [`linkfix_links::LinkNode`], so the same rewriter runs on
//! either.
//!
//! # Example
//!
//! ```
//! use linkfix_links::{LinkPrefixes, rewrite_links};
//! use linkfix_tree::{MdNode, parse_fragment};
//! use pulldown_cmark::Options;
//!
//! let prefixes = LinkPrefixes::default();
//!
//! let mut tree = MdNode::parse("[Setup](/guides/setup)", Options::empty());
//! rewrite_links(&mut tree, &prefixes);
//! let html = tree.to_html();
//! assert_eq!(html, "<p><a href=\"/docs/guides/setup\">Setup</a></p>\n");
//!
//! let mut rendered = parse_fragment(&html).unwrap();
//! assert!(rewrite_links(&mut rendered, &prefixes).is_unchanged());
//! ```

mod error;
mod html;
mod markdown;

pub use error::HtmlParseError;
pub use html::{Element, HtmlNode, parse_fragment};
pub use markdown::{MdKind, MdNode};
