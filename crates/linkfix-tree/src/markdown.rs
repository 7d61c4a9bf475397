//! Owned markdown tree built from `pulldown-cmark` events.

use linkfix_links::LinkNode;
use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType,
    MetadataBlockKind, Options, Parser, Tag, TagEnd,
};

/// Kind of a markdown tree node.
///
/// Container kinds mirror `pulldown-cmark` tags; leaf kinds mirror the
/// remaining events. All strings are owned so the tree outlives the source.
#[derive(Clone, Debug, PartialEq)]
pub enum MdKind {
    /// Document root.
    Root,
    Paragraph,
    Heading {
        level: HeadingLevel,
        id: Option<String>,
        classes: Vec<String>,
        attrs: Vec<(String, Option<String>)>,
    },
    BlockQuote(Option<BlockQuoteKind>),
    /// Code block; `None` for indented, `Some(info)` for fenced.
    CodeBlock(Option<String>),
    HtmlBlock,
    /// List with optional start number (`None` means unordered).
    List(Option<u64>),
    Item,
    FootnoteDefinition(String),
    DefinitionList,
    DefinitionListTitle,
    DefinitionListDefinition,
    Table(Vec<Alignment>),
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    /// Hyperlink; `url` is the rewritable target.
    Link {
        link_type: LinkType,
        url: String,
        title: String,
        id: String,
    },
    Image {
        link_type: LinkType,
        url: String,
        title: String,
        id: String,
    },
    MetadataBlock(MetadataBlockKind),
    Text(String),
    Code(String),
    InlineMath(String),
    DisplayMath(String),
    Html(String),
    InlineHtml(String),
    FootnoteReference(String),
    SoftBreak,
    HardBreak,
    Rule,
    TaskListMarker(bool),
}

impl MdKind {
    fn from_tag(tag: Tag<'_>) -> Self {
        match tag {
            Tag::Paragraph => Self::Paragraph,
            Tag::Heading {
                level,
                id,
                classes,
                attrs,
            } => Self::Heading {
                level,
                id: id.map(CowStr::into_string),
                classes: classes.into_iter().map(CowStr::into_string).collect(),
                attrs: attrs
                    .into_iter()
                    .map(|(key, value)| (key.into_string(), value.map(CowStr::into_string)))
                    .collect(),
            },
            Tag::BlockQuote(kind) => Self::BlockQuote(kind),
            Tag::CodeBlock(CodeBlockKind::Indented) => Self::CodeBlock(None),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Self::CodeBlock(Some(info.into_string())),
            Tag::HtmlBlock => Self::HtmlBlock,
            Tag::List(start) => Self::List(start),
            Tag::Item => Self::Item,
            Tag::FootnoteDefinition(label) => Self::FootnoteDefinition(label.into_string()),
            Tag::DefinitionList => Self::DefinitionList,
            Tag::DefinitionListTitle => Self::DefinitionListTitle,
            Tag::DefinitionListDefinition => Self::DefinitionListDefinition,
            Tag::Table(alignments) => Self::Table(alignments),
            Tag::TableHead => Self::TableHead,
            Tag::TableRow => Self::TableRow,
            Tag::TableCell => Self::TableCell,
            Tag::Emphasis => Self::Emphasis,
            Tag::Strong => Self::Strong,
            Tag::Strikethrough => Self::Strikethrough,
            Tag::Superscript => Self::Superscript,
            Tag::Subscript => Self::Subscript,
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => Self::Link {
                link_type,
                url: dest_url.into_string(),
                title: title.into_string(),
                id: id.into_string(),
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => Self::Image {
                link_type,
                url: dest_url.into_string(),
                title: title.into_string(),
                id: id.into_string(),
            },
            Tag::MetadataBlock(kind) => Self::MetadataBlock(kind),
        }
    }

    /// Leaf kind for a non-tag event. `None` for `Start`/`End`.
    fn from_leaf(event: Event<'_>) -> Option<Self> {
        let kind = match event {
            Event::Start(_) | Event::End(_) => return None,
            Event::Text(text) => Self::Text(text.into_string()),
            Event::Code(code) => Self::Code(code.into_string()),
            Event::InlineMath(math) => Self::InlineMath(math.into_string()),
            Event::DisplayMath(math) => Self::DisplayMath(math.into_string()),
            Event::Html(html) => Self::Html(html.into_string()),
            Event::InlineHtml(html) => Self::InlineHtml(html.into_string()),
            Event::FootnoteReference(label) => Self::FootnoteReference(label.into_string()),
            Event::SoftBreak => Self::SoftBreak,
            Event::HardBreak => Self::HardBreak,
            Event::Rule => Self::Rule,
            Event::TaskListMarker(checked) => Self::TaskListMarker(checked),
        };
        Some(kind)
    }

    /// Borrowed tag for container kinds.
    fn tag(&self) -> Option<Tag<'_>> {
        let tag = match self {
            Self::Paragraph => Tag::Paragraph,
            Self::Heading {
                level,
                id,
                classes,
                attrs,
            } => Tag::Heading {
                level: *level,
                id: id.as_deref().map(CowStr::from),
                classes: classes.iter().map(|c| CowStr::from(c.as_str())).collect(),
                attrs: attrs
                    .iter()
                    .map(|(key, value)| {
                        (
                            CowStr::from(key.as_str()),
                            value.as_deref().map(CowStr::from),
                        )
                    })
                    .collect(),
            },
            Self::BlockQuote(kind) => Tag::BlockQuote(*kind),
            Self::CodeBlock(None) => Tag::CodeBlock(CodeBlockKind::Indented),
            Self::CodeBlock(Some(info)) => Tag::CodeBlock(CodeBlockKind::Fenced(info.as_str().into())),
            Self::HtmlBlock => Tag::HtmlBlock,
            Self::List(start) => Tag::List(*start),
            Self::Item => Tag::Item,
            Self::FootnoteDefinition(label) => Tag::FootnoteDefinition(label.as_str().into()),
            Self::DefinitionList => Tag::DefinitionList,
            Self::DefinitionListTitle => Tag::DefinitionListTitle,
            Self::DefinitionListDefinition => Tag::DefinitionListDefinition,
            Self::Table(alignments) => Tag::Table(alignments.clone()),
            Self::TableHead => Tag::TableHead,
            Self::TableRow => Tag::TableRow,
            Self::TableCell => Tag::TableCell,
            Self::Emphasis => Tag::Emphasis,
            Self::Strong => Tag::Strong,
            Self::Strikethrough => Tag::Strikethrough,
            Self::Superscript => Tag::Superscript,
            Self::Subscript => Tag::Subscript,
            Self::Link {
                link_type,
                url,
                title,
                id,
            } => Tag::Link {
                link_type: *link_type,
                dest_url: url.as_str().into(),
                title: title.as_str().into(),
                id: id.as_str().into(),
            },
            Self::Image {
                link_type,
                url,
                title,
                id,
            } => Tag::Image {
                link_type: *link_type,
                dest_url: url.as_str().into(),
                title: title.as_str().into(),
                id: id.as_str().into(),
            },
            Self::MetadataBlock(kind) => Tag::MetadataBlock(*kind),
            _ => return None,
        };
        Some(tag)
    }

    /// Borrowed event for leaf kinds.
    fn leaf_event(&self) -> Option<Event<'_>> {
        let event = match self {
            Self::Text(text) => Event::Text(text.as_str().into()),
            Self::Code(code) => Event::Code(code.as_str().into()),
            Self::InlineMath(math) => Event::InlineMath(math.as_str().into()),
            Self::DisplayMath(math) => Event::DisplayMath(math.as_str().into()),
            Self::Html(html) => Event::Html(html.as_str().into()),
            Self::InlineHtml(html) => Event::InlineHtml(html.as_str().into()),
            Self::FootnoteReference(label) => Event::FootnoteReference(label.as_str().into()),
            Self::SoftBreak => Event::SoftBreak,
            Self::HardBreak => Event::HardBreak,
            Self::Rule => Event::Rule,
            Self::TaskListMarker(checked) => Event::TaskListMarker(*checked),
            _ => return None,
        };
        Some(event)
    }
}

/// Node of a markdown tree. Each node owns its children.
#[derive(Clone, Debug, PartialEq)]
pub struct MdNode {
    /// What this node represents.
    pub kind: MdKind,
    /// Child nodes in document order. Always empty for leaf kinds.
    pub children: Vec<MdNode>,
}

impl MdNode {
    /// Create a node without children.
    #[must_use]
    pub fn new(kind: MdKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<MdNode>) -> Self {
        self.children = children;
        self
    }

    /// Parse markdown into a tree rooted at [`MdKind::Root`].
    #[must_use]
    pub fn parse(markdown: &str, options: Options) -> Self {
        Self::from_events(Parser::new_ext(markdown, options))
    }

    /// Build a tree from a `pulldown-cmark` event stream.
    ///
    /// Unbalanced streams are tolerated: stray `End` events are dropped and
    /// containers left open at the end are closed.
    pub fn from_events<'a>(events: impl IntoIterator<Item = Event<'a>>) -> Self {
        let mut root = Self::new(MdKind::Root);
        let mut open: Vec<MdNode> = Vec::new();

        for event in events {
            match event {
                Event::Start(tag) => open.push(Self::new(MdKind::from_tag(tag))),
                Event::End(_) => {
                    if let Some(node) = open.pop() {
                        attach(&mut root, &mut open, node);
                    }
                }
                leaf => {
                    if let Some(kind) = MdKind::from_leaf(leaf) {
                        attach(&mut root, &mut open, Self::new(kind));
                    }
                }
            }
        }

        while let Some(node) = open.pop() {
            attach(&mut root, &mut open, node);
        }

        root
    }

    /// Flatten the tree back into `pulldown-cmark` events.
    ///
    /// The root node itself emits no events.
    #[must_use]
    pub fn to_events(&self) -> Vec<Event<'_>> {
        enum Step<'a> {
            Enter(&'a MdNode),
            Exit(TagEnd),
        }

        let mut events = Vec::new();
        let mut stack = vec![Step::Enter(self)];
        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Exit(end) => {
                    events.push(Event::End(end));
                    continue;
                }
                Step::Enter(node) => node,
            };
            if let Some(event) = node.kind.leaf_event() {
                events.push(event);
                continue;
            }
            if let Some(tag) = node.kind.tag() {
                stack.push(Step::Exit(tag.to_end()));
                events.push(Event::Start(tag));
            }
            stack.extend(node.children.iter().rev().map(Step::Enter));
        }
        events
    }

    /// Render the tree to HTML with `pulldown-cmark`'s HTML writer.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, self.to_events().into_iter());
        html
    }

    /// Targets of all link nodes, in document order.
    #[must_use]
    pub fn links(&self) -> Vec<&str> {
        let mut links = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let MdKind::Link { url, .. } = &node.kind {
                links.push(url.as_str());
            }
            stack.extend(node.children.iter().rev());
        }
        links
    }
}

// Dropping nested `Vec`s recurses once per level; flatten the subtree first.
impl Drop for MdNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl Default for MdNode {
    fn default() -> Self {
        Self::new(MdKind::Root)
    }
}

/// Append `node` to the innermost open container, or to the root.
fn attach(root: &mut MdNode, open: &mut [MdNode], node: MdNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.children.push(node),
    }
}

impl LinkNode for MdNode {
    fn is_link(&self) -> bool {
        matches!(self.kind, MdKind::Link { .. })
    }

    fn target_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            MdKind::Link { url, .. } => Some(url),
            _ => None,
        }
    }

    fn children_mut(&mut self) -> &mut [Self] {
        &mut self.children
    }
}
