//! Lenient HTML parser producing a source-mapped node arena.
//!
//! The parser never fails. Unterminated tags are closed at the end of their
//! parent (or of the document), stray end tags are dropped, and the usual
//! implied end tags (`p`, `li`, `td`, ...) are applied. Every node keeps the
//! byte ranges of its outer and inner markup so fragments can be sliced out
//! of the original document verbatim.

use std::ops::Range;

/// Index of a node inside a [`Document`]
pub type NodeId = usize;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Start tags that implicitly close an open `p`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main",
    "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Phrasing elements that may sit between a `p` and a closing block tag
const PHRASING_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark",
    "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic root spanning the whole source
    Document,
    Element {
        /// Lowercased tag name
        name: String,
        /// Attributes in source order, names lowercased, values raw
        attributes: Vec<(String, String)>,
    },
    Text,
    Comment,
    /// `<!DOCTYPE ...>`, `<?xml ...?>` and similar
    Declaration,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Source range including the start and end tags
    pub outer: Range<usize>,
    /// Source range of the content between the tags
    pub inner: Range<usize>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn element_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }
}

/// A parsed markup document borrowing its source
#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    nodes: Vec<Node>,
}

impl<'a> Document<'a> {
    /// Id of the synthetic root node
    pub const ROOT: NodeId = 0;

    /// Parse `source`, recovering from any malformed input
    pub fn parse(source: &'a str) -> Self {
        Parser::new(source).run()
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Markup between the node's start and end tags (text content for text nodes)
    pub fn inner_markup(&self, id: NodeId) -> &'a str {
        &self.source[self.nodes[id].inner.clone()]
    }

    /// Markup including the node's own tags
    pub fn outer_markup(&self, id: NodeId) -> &'a str {
        &self.source[self.nodes[id].outer.clone()]
    }

    /// First element named `name` in document order
    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            if self.nodes[id].element_name() == Some(name) {
                return Some(id);
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        None
    }
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
    open: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let root = Node {
            kind: NodeKind::Document,
            outer: 0..source.len(),
            inner: 0..source.len(),
            children: Vec::new(),
        };
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            nodes: vec![root],
            open: vec![Document::ROOT],
        }
    }

    fn run(mut self) -> Document<'a> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'<' && self.try_markup() {
                continue;
            }
            self.text_run();
        }

        let end = self.source.len();
        self.close_from(1, end);

        Document {
            source: self.source,
            nodes: self.nodes,
        }
    }

    /// Consume a tag, comment or declaration at `pos`; false if `<` is literal text
    fn try_markup(&mut self) -> bool {
        let rest = &self.bytes[self.pos..];
        let next = rest.get(1).copied();

        if rest.starts_with(b"<!--") {
            let end = self
                .find_from(self.pos + 4, b"-->")
                .map(|i| i + 3)
                .unwrap_or(self.bytes.len());
            self.leaf(NodeKind::Comment, self.pos..end);
            self.pos = end;
            true
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            let end = self.find_byte_from(self.pos + 2, b'>').map(|i| i + 1).unwrap_or(self.bytes.len());
            self.leaf(NodeKind::Declaration, self.pos..end);
            self.pos = end;
            true
        } else if next == Some(b'/') && rest.get(2).is_some_and(u8::is_ascii_alphabetic) {
            self.end_tag();
            true
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            self.start_tag();
            true
        } else {
            false
        }
    }

    /// Text up to the next `<` (a literal `<` at `pos` is included)
    fn text_run(&mut self) {
        let start = self.pos;
        let end = self
            .find_byte_from(start + 1, b'<')
            .unwrap_or(self.bytes.len());
        self.pos = end;

        // Merge with a directly preceding text sibling
        let parent = self.current();
        if let Some(&last) = self.nodes[parent].children.last() {
            let node = &mut self.nodes[last];
            if node.is_text() && node.outer.end == start {
                node.outer.end = end;
                node.inner.end = end;
                return;
            }
        }
        self.leaf(NodeKind::Text, start..end);
    }

    fn start_tag(&mut self) {
        let tag_start = self.pos;
        let name_end = self.scan_name(tag_start + 1);
        let name = self.source[tag_start + 1..name_end].to_ascii_lowercase();
        let (attributes, self_closing, tag_end) = self.scan_attributes(name_end);

        self.apply_implied_end_tags(&name, tag_start);

        let void = VOID_ELEMENTS.contains(&name.as_str());
        let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());

        let id = self.push_node(Node {
            kind: NodeKind::Element {
                name: name.clone(),
                attributes,
            },
            outer: tag_start..tag_end,
            inner: tag_end..tag_end,
            children: Vec::new(),
        });
        self.pos = tag_end;

        if void || self_closing {
            return;
        }

        if raw {
            let (content_end, close_end) = match self.find_end_tag_from(tag_end, &name) {
                Some(close_start) => {
                    let close_end = self
                        .find_byte_from(close_start, b'>')
                        .map(|i| i + 1)
                        .unwrap_or(self.bytes.len());
                    (close_start, close_end)
                }
                None => (self.bytes.len(), self.bytes.len()),
            };
            if content_end > tag_end {
                let text = self.nodes.len();
                self.nodes.push(Node {
                    kind: NodeKind::Text,
                    outer: tag_end..content_end,
                    inner: tag_end..content_end,
                    children: Vec::new(),
                });
                self.nodes[id].children.push(text);
            }
            self.nodes[id].inner = tag_end..content_end;
            self.nodes[id].outer.end = close_end;
            self.pos = close_end;
            return;
        }

        self.open.push(id);
    }

    fn end_tag(&mut self) {
        let tag_start = self.pos;
        let name_end = self.scan_name(tag_start + 2);
        let name = self.source[tag_start + 2..name_end].to_ascii_lowercase();
        let tag_end = self
            .find_byte_from(name_end, b'>')
            .map(|i| i + 1)
            .unwrap_or(self.bytes.len());
        self.pos = tag_end;

        let Some(depth) = self
            .open
            .iter()
            .rposition(|&id| self.nodes[id].element_name() == Some(name.as_str()))
        else {
            // Stray end tag
            return;
        };
        if depth == 0 {
            return;
        }

        self.close_from(depth + 1, tag_start);
        let id = self.open.pop().unwrap_or(Document::ROOT);
        self.nodes[id].inner.end = tag_start;
        self.nodes[id].outer.end = tag_end;
    }

    fn apply_implied_end_tags(&mut self, name: &str, at: usize) {
        let (closes, boundaries): (&[&str], &[&str]) = match name {
            "li" => (&["li"], &["ul", "ol", "menu"]),
            "dt" | "dd" => (&["dt", "dd"], &["dl"]),
            "tr" => (&["tr", "td", "th"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            "thead" | "tbody" | "tfoot" => (&["thead", "tbody", "tfoot"], &["table"]),
            "option" => (&["option"], &["select", "datalist", "optgroup"]),
            _ if CLOSES_PARAGRAPH.contains(&name) => (&["p"], &[]),
            _ => return,
        };

        for depth in (1..self.open.len()).rev() {
            let Some(open_name) = self.nodes[self.open[depth]].element_name() else {
                break;
            };
            if closes.contains(&open_name) {
                self.close_from(depth, at);
                return;
            }
            if boundaries.contains(&open_name) {
                return;
            }
            // Only phrasing content may sit between a paragraph and its closer
            if boundaries.is_empty() && !PHRASING_ELEMENTS.contains(&open_name) {
                return;
            }
        }
    }

    /// Close every open element at `depth` and above, ending them at `at`
    fn close_from(&mut self, depth: usize, at: usize) {
        while self.open.len() > depth.max(1) {
            if let Some(id) = self.open.pop() {
                self.nodes[id].inner.end = at;
                self.nodes[id].outer.end = at;
            }
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(Document::ROOT)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        let parent = self.current();
        self.nodes[parent].children.push(id);
        id
    }

    fn leaf(&mut self, kind: NodeKind, range: Range<usize>) {
        self.push_node(Node {
            kind,
            outer: range.clone(),
            inner: range,
            children: Vec::new(),
        });
    }

    fn scan_name(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            if b.is_ascii_whitespace() || b == b'>' || b == b'/' {
                break;
            }
            i += 1;
        }
        i
    }

    /// Parse attributes starting after the tag name.
    ///
    /// Returns the attributes, whether the tag is self-closing (`/>`), and
    /// the offset just past the closing `>`.
    fn scan_attributes(&self, from: usize) -> (Vec<(String, String)>, bool, usize) {
        let bytes = self.bytes;
        let mut attributes = Vec::new();
        let mut i = from;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                return (attributes, false, bytes.len());
            }
            match bytes[i] {
                b'>' => return (attributes, false, i + 1),
                b'/' if bytes.get(i + 1) == Some(&b'>') => return (attributes, true, i + 2),
                b'/' => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            let name = self.source[name_start..i].to_ascii_lowercase();

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let mut value = String::new();
            if bytes.get(i) == Some(&b'=') {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let value_start = i + 1;
                        let value_end = self
                            .find_byte_from(value_start, quote)
                            .unwrap_or(bytes.len());
                        value = self.source[value_start..value_end].to_string();
                        i = (value_end + 1).min(bytes.len());
                    }
                    _ => {
                        let value_start = i;
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        value = self.source[value_start..i].to_string();
                    }
                }
            }
            if !name.is_empty() {
                attributes.push((name, value));
            }
        }
    }

    fn find_byte_from(&self, from: usize, needle: u8) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|&b| b == needle)
            .map(|i| i + from)
    }

    fn find_from(&self, from: usize, needle: &[u8]) -> Option<usize> {
        self.bytes
            .get(from..)?
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|i| i + from)
    }

    /// Case-insensitive search for `</name` followed by a delimiter
    fn find_end_tag_from(&self, from: usize, name: &str) -> Option<usize> {
        let name = name.as_bytes();
        let mut i = from;
        while let Some(lt) = self.find_from(i, b"</") {
            let name_start = lt + 2;
            let name_end = name_start + name.len();
            let matches = self
                .bytes
                .get(name_start..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
            let delimited = self
                .bytes
                .get(name_end)
                .is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
            if matches && delimited {
                return Some(lt);
            }
            i = lt + 2;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_names(doc: &Document<'_>, id: NodeId) -> Vec<String> {
        doc.children(id)
            .iter()
            .filter_map(|&c| doc.node(c).element_name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_parse_nested_elements() {
        let src = "<html><body><p>Hello <b>world</b></p></body></html>";
        let doc = Document::parse(src);
        let p = doc.find_element("p").unwrap();
        assert_eq!(doc.inner_markup(p), "Hello <b>world</b>");
        assert_eq!(doc.outer_markup(p), "<p>Hello <b>world</b></p>");
        let body = doc.find_element("body").unwrap();
        assert_eq!(element_names(&doc, body), vec!["p"]);
    }

    #[test]
    fn test_attributes() {
        let doc = Document::parse(r#"<div id="main" class='a b' data-x=1 hidden>x</div>"#);
        let div = doc.node(doc.find_element("div").unwrap());
        assert_eq!(div.attribute("id"), Some("main"));
        assert_eq!(div.attribute("class"), Some("a b"));
        assert_eq!(div.attribute("data-x"), Some("1"));
        assert_eq!(div.attribute("hidden"), Some(""));
    }

    #[test]
    fn test_unterminated_tags_are_closed_at_parent_end() {
        let src = "<div><span>one<em>two</div><p>after";
        let doc = Document::parse(src);
        let div = doc.find_element("div").unwrap();
        assert_eq!(doc.inner_markup(div), "<span>one<em>two");
        let span = doc.find_element("span").unwrap();
        assert_eq!(doc.inner_markup(span), "one<em>two");
        let p = doc.find_element("p").unwrap();
        assert_eq!(doc.inner_markup(p), "after");
        assert_eq!(element_names(&doc, Document::ROOT), vec!["div", "p"]);
    }

    #[test]
    fn test_implied_paragraph_and_list_item_ends() {
        let doc = Document::parse("<ul><li>a<li>b</ul><p>one<p>two<div>three</div>");
        let ul = doc.find_element("ul").unwrap();
        assert_eq!(element_names(&doc, ul), vec!["li", "li"]);
        assert_eq!(
            element_names(&doc, Document::ROOT),
            vec!["ul", "p", "p", "div"]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        let doc = Document::parse("<p>a<br>b<img src=x.png/>c<x-icon/>d</p>");
        let p = doc.find_element("p").unwrap();
        assert_eq!(element_names(&doc, p), vec!["br", "img", "x-icon"]);
        assert_eq!(doc.inner_markup(p), "a<br>b<img src=x.png/>c<x-icon/>d");
    }

    #[test]
    fn test_raw_text_elements() {
        let src = "<script>if (a < b && c > d) { x('</div>') }</script><p>x</p>";
        let doc = Document::parse(src);
        let script = doc.find_element("script").unwrap();
        assert_eq!(doc.inner_markup(script), "if (a < b && c > d) { x('</div>') }");
        assert!(doc.find_element("div").is_none());
        assert!(doc.find_element("p").is_some());
    }

    #[test]
    fn test_stray_end_tags_and_literal_angle_brackets() {
        let doc = Document::parse("</span>1 < 2 <p>ok</p></em>");
        let root_children = doc.children(Document::ROOT);
        assert_eq!(root_children.len(), 2);
        assert_eq!(doc.inner_markup(root_children[0]), "1 < 2 ");
        assert_eq!(element_names(&doc, Document::ROOT), vec!["p"]);
    }

    #[test]
    fn test_comments_and_declarations() {
        let doc = Document::parse("<!DOCTYPE html><!-- note --><p>x</p><!-- open");
        let kinds: Vec<&NodeKind> = doc
            .children(Document::ROOT)
            .iter()
            .map(|&id| &doc.node(id).kind)
            .collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(kinds[0], &NodeKind::Declaration);
        assert_eq!(kinds[1], &NodeKind::Comment);
        assert_eq!(kinds[3], &NodeKind::Comment);
    }

    #[test]
    fn test_truncated_start_tag() {
        let doc = Document::parse("<p>text</p><div class=\"unterminated");
        assert!(doc.find_element("div").is_some());
        assert_eq!(doc.inner_markup(doc.find_element("p").unwrap()), "text");
    }
}
