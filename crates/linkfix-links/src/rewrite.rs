//! Tree walk that rewrites link targets in place.

use tracing::{debug, trace};

use crate::classify::LinkPrefixes;
use crate::node::LinkNode;

/// A single rewrite applied to a link target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRewrite {
    /// Target before the rewrite.
    pub from: String,
    /// Target after the rewrite.
    pub to: String,
}

/// Summary of one rewrite pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Number of link nodes visited.
    pub links: usize,
    /// Rewrites applied, in document order.
    pub rewrites: Vec<LinkRewrite>,
}

impl RewriteReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.rewrites.is_empty()
    }

    /// Number of rewritten link targets.
    #[must_use]
    pub fn rewritten(&self) -> usize {
        self.rewrites.len()
    }

    /// Add the results of another pass to this one.
    pub fn merge(&mut self, other: RewriteReport) {
        self.links += other.links;
        self.rewrites.extend(other.rewrites);
    }
}

/// Rewrite every link target under `root` that needs the docs prefix.
///
/// Visits each node exactly once, depth-first in document order. Only nodes
/// reporting [`LinkNode::is_link`] are inspected; each rewrite touches only
/// the visited node's own target, so visit order does not affect the result.
///
/// The walk cannot fail. A tree without links is left untouched.
pub fn rewrite_links<N: LinkNode>(root: &mut N, prefixes: &LinkPrefixes) -> RewriteReport {
    let mut report = RewriteReport::default();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_link() {
            if let Some(target) = node.target_mut() {
                report.links += 1;
                match prefixes.rewrite(target) {
                    Some(rewritten) => {
                        debug!(from = %target, to = %rewritten, "Rewrote link");
                        let from = std::mem::replace(target, rewritten);
                        report.rewrites.push(LinkRewrite {
                            from,
                            to: target.clone(),
                        });
                    }
                    None => {
                        trace!(link = %target, class = %prefixes.classify(target), "Kept link");
                    }
                }
            }
        }
        // Reversed so the stack pops children in document order.
        stack.extend(node.children_mut().iter_mut().rev());
    }

    report
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestNode {
        link: Option<String>,
        label: String,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn text(label: &str) -> Self {
            Self {
                link: None,
                label: label.to_owned(),
                children: Vec::new(),
            }
        }

        fn link(target: &str) -> Self {
            Self {
                link: Some(target.to_owned()),
                label: String::new(),
                children: Vec::new(),
            }
        }

        fn with_children(mut self, children: Vec<TestNode>) -> Self {
            self.children = children;
            self
        }

        fn reversed(mut self) -> Self {
            self.children = self.children.into_iter().rev().map(Self::reversed).collect();
            self
        }
    }

    impl LinkNode for TestNode {
        fn is_link(&self) -> bool {
            self.link.is_some()
        }

        fn target_mut(&mut self) -> Option<&mut String> {
            self.link.as_mut()
        }

        fn children_mut(&mut self) -> &mut [Self] {
            &mut self.children
        }
    }

    fn sample_tree() -> TestNode {
        TestNode::text("root").with_children(vec![
            TestNode::text("intro /guides/setup"),
            TestNode::link("/guides/setup"),
            TestNode::text("list").with_children(vec![
                TestNode::link("https://example.com/x"),
                TestNode::link("#section-2"),
                TestNode::link("@site/static/img/x.png"),
                TestNode::link("/docs/guides/setup"),
                TestNode::link("relative/page"),
                TestNode::link("/api/reference").with_children(vec![TestNode::link("/nested")]),
            ]),
        ])
    }

    #[test]
    fn test_rewrite_only_absolute_paths() {
        let mut tree = sample_tree();
        let report = rewrite_links(&mut tree, &LinkPrefixes::default());

        assert_eq!(report.links, 8);
        assert_eq!(
            report.rewrites,
            vec![
                LinkRewrite {
                    from: "/guides/setup".to_owned(),
                    to: "/docs/guides/setup".to_owned(),
                },
                LinkRewrite {
                    from: "/api/reference".to_owned(),
                    to: "/docs/api/reference".to_owned(),
                },
                LinkRewrite {
                    from: "/nested".to_owned(),
                    to: "/docs/nested".to_owned(),
                },
            ]
        );
        assert_eq!(tree.children[1].link.as_deref(), Some("/docs/guides/setup"));
        assert_eq!(
            tree.children[2].children[0].link.as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn test_non_link_nodes_untouched() {
        let mut tree = sample_tree();
        let _ = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(tree.children[0], TestNode::text("intro /guides/setup"));
        assert_eq!(tree.label, "root");
    }

    #[test]
    fn test_rewrite_twice_is_idempotent() {
        let prefixes = LinkPrefixes::default();
        let mut tree = sample_tree();
        let _ = rewrite_links(&mut tree, &prefixes);
        let once = tree.clone();

        let second = rewrite_links(&mut tree, &prefixes);
        assert!(second.is_unchanged());
        assert_eq!(second.links, 8);
        assert_eq!(tree, once);
    }

    #[test]
    fn test_visit_order_does_not_matter() {
        let prefixes = LinkPrefixes::default();
        let mut forward = sample_tree();
        let mut backward = sample_tree().reversed();

        let forward_report = rewrite_links(&mut forward, &prefixes);
        let backward_report = rewrite_links(&mut backward, &prefixes);

        assert_eq!(backward.reversed(), forward);
        assert_eq!(forward_report.rewritten(), backward_report.rewritten());
    }

    #[test]
    fn test_tree_without_links_is_noop() {
        let mut tree = TestNode::text("root").with_children(vec![TestNode::text("a")]);
        let before = tree.clone();
        let report = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(report, RewriteReport::default());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_root_can_be_a_link() {
        let mut tree = TestNode::link("/top");
        let report = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(report.rewritten(), 1);
        assert_eq!(tree.link.as_deref(), Some("/docs/top"));
    }

    #[test]
    fn test_custom_prefix_passed_explicitly() {
        let mut tree = sample_tree();
        let prefixes = LinkPrefixes::new("/handbook/", "@site/");
        let report = rewrite_links(&mut tree, &prefixes);
        assert_eq!(report.rewrites[0].to, "/handbook/guides/setup");
        // The default docs prefix means nothing to a custom deployment.
        assert_eq!(
            tree.children[2].children[3].link.as_deref(),
            Some("/handbook/docs/guides/setup")
        );
    }

    #[test]
    fn test_merge_reports() {
        let prefixes = LinkPrefixes::default();
        let mut report = rewrite_links(&mut TestNode::link("/a"), &prefixes);
        report.merge(rewrite_links(&mut TestNode::link("#b"), &prefixes));
        assert_eq!(report.links, 2);
        assert_eq!(report.rewritten(), 1);
    }
}
