//! HTML fragment tree with a lenient `quick-xml` parser and serializer.

use std::borrow::Cow;
use std::fmt::Write;

use linkfix_links::LinkNode;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::HtmlParseError;

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is text up to the matching end tag, never markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// HTML element with ordered attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name as written in the source.
    pub tag: String,
    /// Attributes in source order, values unescaped.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<HtmlNode>,
}

impl Element {
    /// Create an element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<HtmlNode>) -> Self {
        self.children = children;
        self
    }

    /// Attribute value by ASCII case-insensitive name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Mutable attribute value by ASCII case-insensitive name.
    pub fn attr_mut(&mut self, name: &str) -> Option<&mut String> {
        self.attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Whether the tag matches `name`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.tag.eq_ignore_ascii_case(name)
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.iter().any(|void| self.is(void))
    }

    fn is_raw_text(&self) -> bool {
        RAW_TEXT_ELEMENTS.iter().any(|raw| self.is(raw))
    }
}

// Dropping nested `Vec`s recurses once per level; flatten the subtree first.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            match &mut node {
                HtmlNode::Element(element) => pending.append(&mut element.children),
                HtmlNode::Fragment(children) => pending.append(children),
                _ => {}
            }
        }
    }
}

/// Node of an HTML fragment tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlNode {
    /// Top-level sequence of nodes without an enclosing element.
    Fragment(Vec<HtmlNode>),
    Element(Element),
    /// Text exactly as it appeared in the source, entity references included.
    Text(String),
    Comment(String),
    CData(String),
    Doctype(String),
    /// Content between `<?` and `?>`, XML declarations included.
    ProcessingInstruction(String),
}

impl HtmlNode {
    /// Serialize the tree back to HTML.
    ///
    /// Text is written verbatim; attribute values are escaped again. Void
    /// elements are written self-closed (`<br />`).
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096);
        serialize(self, &mut out);
        out
    }

    /// Element payload, if this node is an element.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Child nodes; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[HtmlNode] {
        match self {
            Self::Fragment(children) => children,
            Self::Element(element) => &element.children,
            _ => &[],
        }
    }

    /// Values of `href` on every `<a>` element, in document order.
    #[must_use]
    pub fn hrefs(&self) -> Vec<&str> {
        let mut hrefs = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(href) = node
                .as_element()
                .filter(|element| element.is("a"))
                .and_then(|element| element.attr("href"))
            {
                hrefs.push(href);
            }
            stack.extend(node.children().iter().rev());
        }
        hrefs
    }
}

impl LinkNode for HtmlNode {
    /// `<a>` element carrying a non-empty `href`.
    fn is_link(&self) -> bool {
        self.as_element().is_some_and(|element| {
            element.is("a") && element.attr("href").is_some_and(|href| !href.is_empty())
        })
    }

    fn target_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Element(element) if element.is("a") => {
                element.attr_mut("href").filter(|href| !href.is_empty())
            }
            _ => None,
        }
    }

    fn children_mut(&mut self) -> &mut [Self] {
        match self {
            Self::Fragment(children) => children,
            Self::Element(element) => &mut element.children,
            Self::Text(_)
            | Self::Comment(_)
            | Self::CData(_)
            | Self::Doctype(_)
            | Self::ProcessingInstruction(_) => &mut [],
        }
    }
}

/// Parse an HTML fragment into a [`HtmlNode::Fragment`].
///
/// Parsing is lenient so that rendered markdown and embedded raw HTML both
/// load, and everything but the parsed structure is kept verbatim:
/// - void elements never take children, with or without `/>`
/// - `script`, `style`, `textarea` and `title` hold their content as one
///   text node
/// - a `<` that opens no tag, or markup the tokenizer rejects, is text
/// - a bare `&` is text
/// - end tags without a matching open element are ignored
/// - an end tag closes any elements left open inside it
/// - attributes without values or quotes are accepted
/// - elements still open at the end of input are closed
///
/// # Errors
///
/// Returns an error if the input cannot be decoded.
pub fn parse_fragment(html: &str) -> Result<HtmlNode, HtmlParseError> {
    let mut tokens = Tokenizer::new(html);
    let mut tree = TreeBuilder::default();

    loop {
        let start = tokens.position();
        if opens_no_markup(&html[start..]) {
            tree.push_text("<");
            tokens.seek(start + 1);
            continue;
        }

        let event = match tokens.reader.read_event() {
            Ok(event) => event,
            Err(_) if html[start..].starts_with('<') => {
                tree.push_text("<");
                tokens.seek(start + 1);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let decoder = tokens.reader.decoder();

        match event {
            Event::Start(e) => {
                let mut element = decode_element(decoder, &e)?;
                if element.is_void() {
                    tree.push_child(HtmlNode::Element(element));
                } else if element.is_raw_text() {
                    let content_start = tokens.position();
                    let content_end = find_end_tag(&html[content_start..], &element.tag)
                        .map_or(html.len(), |offset| content_start + offset);
                    if content_end > content_start {
                        let content = &html[content_start..content_end];
                        element.children.push(HtmlNode::Text(content.to_owned()));
                    }
                    tree.open(element);
                    tokens.seek(content_end);
                } else {
                    tree.open(element);
                }
            }
            Event::Empty(e) => {
                let element = decode_element(decoder, &e)?;
                tree.push_child(HtmlNode::Element(element));
            }
            Event::End(e) => {
                let qname = e.name();
                let name = decoder.decode(qname.as_ref())?;
                tree.close(&name);
            }
            Event::Text(e) => {
                let text = decoder.decode(&e)?;
                tree.push_text(&text);
            }
            Event::GeneralRef(e) => {
                let entity = decoder.decode(&e)?;
                tree.push_text(&format!("&{entity};"));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                tree.push_child(HtmlNode::CData(text));
            }
            Event::Comment(e) => {
                let text = decoder.decode(&e)?.into_owned();
                tree.push_child(HtmlNode::Comment(text));
            }
            Event::DocType(e) => {
                let text = decoder.decode(&e)?.trim_start().to_owned();
                tree.push_child(HtmlNode::Doctype(text));
            }
            Event::Decl(_) | Event::PI(_) => {
                let raw = &html[start..tokens.position()];
                let content = raw
                    .strip_prefix("<?")
                    .and_then(|inner| inner.strip_suffix("?>"))
                    .unwrap_or(raw);
                tree.push_child(HtmlNode::ProcessingInstruction(content.to_owned()));
            }
            Event::Eof => break,
        }
    }

    Ok(tree.finish())
}

/// `quick-xml` reader that can be restarted at any offset of the input.
struct Tokenizer<'a> {
    html: &'a str,
    /// Offset of the reader's input within `html`.
    offset: usize,
    reader: Reader<&'a [u8]>,
}

impl<'a> Tokenizer<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            html,
            offset: 0,
            reader: lenient_reader(html),
        }
    }

    /// Offset of the next unread byte within the whole input.
    fn position(&self) -> usize {
        let consumed = usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX);
        self.offset.saturating_add(consumed).min(self.html.len())
    }

    /// Continue tokenizing at `position`, which must be a char boundary.
    fn seek(&mut self, position: usize) {
        let html = self.html;
        self.offset = position;
        self.reader = lenient_reader(&html[position..]);
    }
}

fn lenient_reader(html: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

/// Whether `rest` starts with a `<` that cannot open a tag, comment,
/// declaration or processing instruction.
fn opens_no_markup(rest: &str) -> bool {
    match rest.as_bytes() {
        [b'<', b'/', next, ..] => !next.is_ascii_alphabetic(),
        [b'<', next, ..] => !(next.is_ascii_alphabetic() || matches!(next, b'!' | b'?')),
        [b'<'] => true,
        _ => false,
    }
}

/// Offset of the end tag closing a raw-text element named `tag`.
fn find_end_tag(rest: &str, tag: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let name = tag.as_bytes();
    let mut from = 0;
    while let Some(found) = rest[from..].find("</") {
        let at = from + found;
        let name_end = at + 2 + name.len();
        let matches_name = bytes
            .get(at + 2..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
        let terminated = bytes
            .get(name_end)
            .is_none_or(|&b| b == b'>' || b == b'/' || b.is_ascii_whitespace());
        if matches_name && terminated {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

fn decode_element(decoder: Decoder, e: &BytesStart) -> Result<Element, HtmlParseError> {
    let tag = decoder.decode(e.name().as_ref())?.into_owned();
    let mut attrs = Vec::new();
    for attr in e.html_attributes().flatten() {
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );
        attrs.push((key, value));
    }
    Ok(Element {
        tag,
        attrs,
        children: Vec::new(),
    })
}

/// Top-level nodes plus the stack of elements still open.
#[derive(Default)]
struct TreeBuilder {
    root: Vec<HtmlNode>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn siblings(&mut self) -> &mut Vec<HtmlNode> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        }
    }

    /// Append `node` to the innermost open element, or to the top level.
    fn push_child(&mut self, node: HtmlNode) {
        self.siblings().push(node);
    }

    /// Append text, merging with a preceding text node.
    fn push_text(&mut self, text: &str) {
        let siblings = self.siblings();
        if let Some(HtmlNode::Text(existing)) = siblings.last_mut() {
            existing.push_str(text);
        } else {
            siblings.push(HtmlNode::Text(text.to_owned()));
        }
    }

    fn open(&mut self, element: Element) {
        self.open.push(element);
    }

    /// Close the innermost open element named `name` and everything inside it.
    fn close(&mut self, name: &str) {
        if let Some(pos) = self.open.iter().rposition(|element| element.is(name)) {
            while self.open.len() > pos {
                self.close_innermost();
            }
        }
    }

    fn close_innermost(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push_child(HtmlNode::Element(element));
        }
    }

    fn finish(mut self) -> HtmlNode {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        HtmlNode::Fragment(self.root)
    }
}

enum Step<'a> {
    Node(&'a HtmlNode),
    Close(&'a Element),
}

fn serialize(root: &HtmlNode, out: &mut String) {
    let mut stack = vec![Step::Node(root)];
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Close(element) => {
                write!(out, "</{}>", element.tag).unwrap();
                continue;
            }
            Step::Node(node) => node,
        };
        match node {
            HtmlNode::Fragment(children) => stack.extend(children.iter().rev().map(Step::Node)),
            HtmlNode::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (key, value) in &element.attrs {
                    write!(out, r#" {key}="{}""#, escape_attr(value)).unwrap();
                }
                if element.is_void() && element.children.is_empty() {
                    out.push_str(" />");
                } else {
                    out.push('>');
                    stack.push(Step::Close(element));
                    stack.extend(element.children.iter().rev().map(Step::Node));
                }
            }
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Comment(text) => write!(out, "<!--{text}-->").unwrap(),
            HtmlNode::CData(text) => write!(out, "<![CDATA[{text}]]>").unwrap(),
            HtmlNode::Doctype(text) => write!(out, "<!DOCTYPE {text}>").unwrap(),
            HtmlNode::ProcessingInstruction(text) => write!(out, "<?{text}?>").unwrap(),
        }
    }
}

/// Escape an attribute value for a double-quoted attribute.
fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use linkfix_links::{LinkPrefixes, rewrite_links};
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(html: &str) -> HtmlNode {
        parse_fragment(html).unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let tree = parse(r#"<p>Hi <a href="/x" class="c">there</a></p>"#);
        assert_eq!(
            tree,
            HtmlNode::Fragment(vec![HtmlNode::Element(Element::new("p").with_children(vec![
                HtmlNode::Text("Hi ".to_owned()),
                HtmlNode::Element(
                    Element::new("a")
                        .with_attr("href", "/x")
                        .with_attr("class", "c")
                        .with_children(vec![HtmlNode::Text("there".to_owned())])
                ),
            ]))])
        );
    }

    #[test]
    fn test_serialize_preserves_rendered_markdown() {
        let html = "<h1>Title</h1>\n<p>A <a href=\"/x\" title=\"T\">l</a> &amp; b&nbsp;c<br />\n\
                    <img src=\"/i.png\" alt=\"i\" /></p>\n<!-- note -->\n<hr />\n";
        assert_eq!(parse(html).to_html(), html);
    }

    #[test]
    fn test_void_elements_without_slash() {
        let tree = parse(r#"<p>a<br>b<img src="/i.png"></p>"#);
        assert_eq!(tree.to_html(), r#"<p>a<br />b<img src="/i.png" /></p>"#);
    }

    #[test]
    fn test_unmatched_and_unclosed_tags() {
        let tree = parse("<div><span>x</div></em><p>open");
        assert_eq!(tree.to_html(), "<div><span>x</span></div><p>open</p>");
    }

    #[test]
    fn test_attribute_without_value() {
        let tree = parse("<input disabled type=checkbox>");
        let HtmlNode::Fragment(children) = &tree else {
            panic!("expected fragment");
        };
        let input = children[0].as_element().unwrap();
        assert_eq!(input.attr("disabled"), Some(""));
        assert_eq!(input.attr("type"), Some("checkbox"));
    }

    #[test]
    fn test_attribute_escaping_round_trip() {
        let tree = parse(r#"<a href="/search?q=a&amp;b=&quot;c&quot;">s</a>"#);
        assert_eq!(tree.hrefs(), vec![r#"/search?q=a&b="c""#]);
        assert_eq!(
            tree.to_html(),
            r#"<a href="/search?q=a&amp;b=&quot;c&quot;">s</a>"#
        );
    }

    #[test]
    fn test_rewrite_anchor_hrefs() {
        let mut tree = parse(
            r##"<p><a href="/guides/setup">a</a><a href="#top">b</a><a href="/docs/x">c</a>
<a href="https://example.com">d</a><a href="@site/static/f.pdf">e</a><a href="rel">f</a></p>"##,
        );
        let report = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(report.links, 6);
        assert_eq!(report.rewritten(), 1);
        assert_eq!(
            tree.hrefs(),
            vec![
                "/docs/guides/setup",
                "#top",
                "/docs/x",
                "https://example.com",
                "@site/static/f.pdf",
                "rel",
            ]
        );
    }

    #[test]
    fn test_only_anchor_elements_with_href_are_links() {
        let mut tree = parse(
            r#"<link href="/style.css"><img src="/i.png"><a name="top">t</a><a href="">e</a><A HREF="/upper">u</A>"#,
        );
        let report = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(report.links, 1);
        assert_eq!(
            tree.to_html(),
            r#"<link href="/style.css" /><img src="/i.png" /><a name="top">t</a><a href="">e</a><A HREF="/docs/upper">u</A>"#
        );
    }

    #[test]
    fn test_nested_anchor_in_raw_block() {
        let mut tree = parse(r#"<div class="card"><ul><li><a href="/a">a</a></li></ul></div>"#);
        let _ = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(tree.hrefs(), vec!["/docs/a"]);
    }

    #[test]
    fn test_empty_input() {
        let tree = parse("");
        assert_eq!(tree, HtmlNode::Fragment(Vec::new()));
        assert_eq!(tree.to_html(), "");
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let html = "<script>if (a < b && c) { x(\"</p>\"); }</script><a href=\"/a\">a</a>";
        let tree = parse(html);
        let HtmlNode::Fragment(children) = &tree else {
            panic!("expected fragment");
        };
        let script = children[0].as_element().unwrap();
        assert_eq!(
            script.children,
            vec![HtmlNode::Text(
                "if (a < b && c) { x(\"</p>\"); }".to_owned()
            )]
        );
        assert_eq!(tree.hrefs(), vec!["/a"]);
        assert_eq!(tree.to_html(), html);
    }

    #[test]
    fn test_raw_text_end_tag_is_case_insensitive() {
        let html = "<STYLE>a > b { color: red }</style ><textarea><a href=\"/x\"></textarea>";
        let mut tree = parse(html);
        assert!(rewrite_links(&mut tree, &LinkPrefixes::default()).is_unchanged());
        assert_eq!(
            tree.to_html(),
            "<STYLE>a > b { color: red }</STYLE><textarea><a href=\"/x\"></textarea>"
        );
    }

    #[test]
    fn test_unterminated_script_runs_to_end() {
        let html = "<script>let a = 1 < 2;";
        assert_eq!(parse(html).to_html(), "<script>let a = 1 < 2;</script>");
    }

    #[test]
    fn test_stray_less_than_is_text() {
        let html = "<div>\n1 < 2 and 3<4 <a href=\"/a\">a</a> </ x\n</div>\n";
        let tree = parse(html);
        assert_eq!(tree.hrefs(), vec!["/a"]);
        assert_eq!(tree.to_html(), html);
    }

    #[test]
    fn test_rejected_markup_is_text() {
        let html = "<p>a <!x> b <?never closed";
        assert_eq!(parse(html).to_html(), "<p>a <!x> b <?never closed</p>");
    }

    #[test]
    fn test_bare_ampersand_is_text() {
        let html = "<div>AT&T &amp; R&D; & more</div>";
        assert_eq!(parse(html).to_html(), html);
    }

    #[test]
    fn test_processing_instructions_preserved() {
        let html = "<?xml version=\"1.0\"?><?php echo 1; ?><p>x</p>";
        let tree = parse(html);
        let HtmlNode::Fragment(children) = &tree else {
            panic!("expected fragment");
        };
        assert_eq!(
            children[1],
            HtmlNode::ProcessingInstruction("php echo 1; ".to_owned())
        );
        assert_eq!(tree.to_html(), html);
    }

    #[test]
    fn test_deeply_nested_tree() {
        let depth = 100_000;
        let html = format!("{}<a href=\"/a\">a</a>", "<div>".repeat(depth));
        let mut tree = parse(&html);

        let report = rewrite_links(&mut tree, &LinkPrefixes::default());
        assert_eq!(report.rewritten(), 1);

        let out = tree.to_html();
        assert!(out.starts_with("<div><div>"));
        assert!(out.contains("<a href=\"/docs/a\">a</a>"));
        assert_eq!(out.len(), html.len() + "/docs".len() + depth * "</div>".len());
        drop(tree);
    }

    #[test]
    fn test_doctype_and_cdata_preserved() {
        let html = "<!DOCTYPE html><svg><![CDATA[x < y]]></svg>";
        assert_eq!(parse(html).to_html(), html);
    }
}
