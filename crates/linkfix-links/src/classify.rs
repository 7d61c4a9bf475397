//! Link target classification.

use std::fmt;

/// Canonical documentation prefix used when none is configured.
pub const DEFAULT_DOCS_PREFIX: &str = "/docs/";

/// Alias marker used when none is configured.
///
/// Targets starting with the marker are resolved by the rendering pipeline
/// relative to the site's static-asset root.
pub const DEFAULT_ALIAS_MARKER: &str = "@site/";

/// URL schemes that mark a target as external.
const EXTERNAL_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

/// Outcome of classifying a raw link target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// `http://`, `https://` or `mailto:` target.
    External,
    /// Same-page anchor (`#section`).
    AnchorOnly,
    /// Starts with the alias marker; resolved by the rendering pipeline.
    AliasReference,
    /// Already carries the docs prefix, or is relative and needs no rewrite.
    AlreadyPrefixed,
    /// Absolute path outside the docs prefix.
    NeedsPrefix,
}

impl LinkClass {
    /// Whether targets of this class get the docs prefix prepended.
    #[must_use]
    pub fn needs_rewrite(self) -> bool {
        self == Self::NeedsPrefix
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::AnchorOnly => "anchor",
            Self::AliasReference => "alias",
            Self::AlreadyPrefixed => "prefixed",
            Self::NeedsPrefix => "needs-prefix",
        }
    }
}

impl fmt::Display for LinkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment constants that drive classification.
///
/// Fixed per site deployment and passed explicitly to every rewrite, so a
/// pass never depends on global pipeline configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPrefixes {
    docs_prefix: String,
    alias_marker: String,
}

impl Default for LinkPrefixes {
    fn default() -> Self {
        Self {
            docs_prefix: DEFAULT_DOCS_PREFIX.to_owned(),
            alias_marker: DEFAULT_ALIAS_MARKER.to_owned(),
        }
    }
}

impl LinkPrefixes {
    /// Create prefixes from a docs prefix and an alias marker.
    ///
    /// The docs prefix is normalized to carry exactly one leading and one
    /// trailing slash (`docs` and `/docs` both become `/docs/`). An empty
    /// alias marker never matches.
    #[must_use]
    pub fn new(docs_prefix: &str, alias_marker: impl Into<String>) -> Self {
        Self {
            docs_prefix: normalize_prefix(docs_prefix),
            alias_marker: alias_marker.into(),
        }
    }

    /// Canonical docs prefix, always `/`-delimited on both ends.
    #[must_use]
    pub fn docs_prefix(&self) -> &str {
        &self.docs_prefix
    }

    /// Alias marker.
    #[must_use]
    pub fn alias_marker(&self) -> &str {
        &self.alias_marker
    }

    /// Classify a raw link target.
    ///
    /// Rules are checked in order and the first match wins:
    ///
    /// 1. external scheme → [`LinkClass::External`]
    /// 2. `#` → [`LinkClass::AnchorOnly`]
    /// 3. alias marker → [`LinkClass::AliasReference`]
    /// 4. docs prefix → [`LinkClass::AlreadyPrefixed`]
    /// 5. `/` → [`LinkClass::NeedsPrefix`]
    /// 6. anything else (relative, empty) → [`LinkClass::AlreadyPrefixed`]
    ///
    /// Rule 4 must precede rule 5: it keeps a second pass from prefixing a
    /// target the first pass already rewrote.
    #[must_use]
    pub fn classify(&self, target: &str) -> LinkClass {
        if EXTERNAL_SCHEMES
            .iter()
            .any(|scheme| target.starts_with(scheme))
        {
            LinkClass::External
        } else if target.starts_with('#') {
            LinkClass::AnchorOnly
        } else if !self.alias_marker.is_empty() && target.starts_with(&self.alias_marker) {
            LinkClass::AliasReference
        } else if target.starts_with(&self.docs_prefix) {
            LinkClass::AlreadyPrefixed
        } else if target.starts_with('/') {
            LinkClass::NeedsPrefix
        } else {
            // Relative targets are resolved by the renderer itself.
            LinkClass::AlreadyPrefixed
        }
    }

    /// Rewritten target, or `None` when the target stays as is.
    ///
    /// The prefix's trailing slash is folded into the target's leading one:
    /// `/guides/setup` becomes `/docs/guides/setup`.
    #[must_use]
    pub fn rewrite(&self, target: &str) -> Option<String> {
        if !self.classify(target).needs_rewrite() {
            return None;
        }
        let base = self.docs_prefix.trim_end_matches('/');
        Some(format!("{base}{target}"))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}
