//! Error types for tree construction.

/// Error while parsing rendered HTML into a tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HtmlParseError {
    /// XML tokenizer error.
    #[error("HTML parse error")]
    Xml(#[from] quick_xml::Error),

    /// Encoding error while decoding names or text.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
