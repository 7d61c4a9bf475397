//! Capability trait for tree shapes that carry links.

/// A node in a document tree that may be a link.
///
/// Each tree shape (markdown tree, rendered HTML tree) implements this once.
/// The traversal and the classifier are written against the trait, so the
/// stages share one behavior.
pub trait LinkNode: Sized {
    /// Whether this node is a link that the rewriter should inspect.
    fn is_link(&self) -> bool;

    /// Mutable link target of this node.
    ///
    /// Returns `None` when the node is not a link.
    fn target_mut(&mut self) -> Option<&mut String>;

    /// Direct children of this node.
    fn children_mut(&mut self) -> &mut [Self];
}
