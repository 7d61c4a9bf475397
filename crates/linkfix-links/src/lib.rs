//! Internal link classification and rewriting for documentation trees.
//!
//! When a documentation site is served under a non-root base path (for
//! example `/docs/`), hand-written absolute links such as `/guides/setup`
//! no longer resolve. This crate classifies every link target and prepends
//! the base path where needed.
//!
//! # Architecture
//!
//! - [`LinkPrefixes`]: the two deployment constants (docs prefix, alias marker)
//!   and the classifier built on them
//! - [`LinkClass`]: the outcome of classifying one target string
//! - [`LinkNode`]: capability trait implemented once per tree shape
//! - [`rewrite_links`]: tree walk written once against [`LinkNode`]
//!
//! The same classifier backs every tree shape, so a target rewritten on the
//! markdown tree classifies as [`LinkClass::AlreadyPrefixed`] on the rendered
//! HTML tree and is left alone.
//!
//! # Example
//!
//! ```
//! use linkfix_links::{LinkClass, LinkPrefixes};
//!
//! let prefixes = LinkPrefixes::default();
//! assert_eq!(prefixes.classify("/guides/setup"), LinkClass::NeedsPrefix);
//! assert_eq!(
//!     prefixes.rewrite("/guides/setup").as_deref(),
//!     Some("/docs/guides/setup")
//! );
//! assert_eq!(prefixes.rewrite("/docs/guides/setup"), None);
//! ```

mod classify;
mod node;
mod rewrite;

pub use classify::{DEFAULT_ALIAS_MARKER, DEFAULT_DOCS_PREFIX, LinkClass, LinkPrefixes};
pub use node::LinkNode;
pub use rewrite::{LinkRewrite, RewriteReport, rewrite_links};
