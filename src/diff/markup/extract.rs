//! Block-aware plain-text extraction from markup.

use std::borrow::Cow;

use super::parser::{Document, NodeId, NodeKind};

/// Elements whose content never counts as page text
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "svg", "header", "footer", "nav", "aside", "form", "head",
    "template",
];

/// Roles marking chrome rather than content
const SKIPPED_ROLES: &[&str] = &["navigation", "search"];

/// Elements followed by a separator so adjacent blocks don't run together
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "div", "li", "ul", "ol", "tr", "td", "th", "br",
    "hr", "article", "section",
];

/// Extract normalized text from an HTML document.
///
/// Text is taken from `<body>` (or the whole document when there is none),
/// skipping scripts, styles and navigation chrome. Whitespace is collapsed
/// to single spaces and trimmed.
pub fn extract_text(markup: &str) -> String {
    let doc = Document::parse(markup);
    let start = doc.find_element("body").unwrap_or(Document::ROOT);

    let mut raw = String::new();
    collect_text(&doc, start, &mut raw);

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(doc: &Document<'_>, id: NodeId, out: &mut String) {
    let node = doc.node(id);
    match &node.kind {
        NodeKind::Text => {
            let text = doc.inner_markup(id);
            if !text.trim().is_empty() {
                out.push_str(&decode_entities(text));
                out.push(' ');
            }
        }
        NodeKind::Element { name, .. } => {
            if SKIPPED_ELEMENTS.contains(&name.as_str())
                || node
                    .attribute("role")
                    .is_some_and(|role| SKIPPED_ROLES.contains(&role.trim()))
            {
                return;
            }
            for &child in doc.children(id) {
                collect_text(doc, child, out);
            }
            if BLOCK_ELEMENTS.contains(&name.as_str()) {
                out.push(' ');
            }
        }
        NodeKind::Document => {
            for &child in doc.children(id) {
                collect_text(doc, child, out);
            }
        }
        NodeKind::Comment | NodeKind::Declaration => {}
    }
}

/// Decode character references (`&amp;`, `&#39;`, `&#x2014;`, ...)
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate[1..].find(';').filter(|&end| end <= 10) {
            Some(end) => {
                let entity = &candidate[1..end + 1];
                match decode_entity(entity) {
                    Some(ch) => {
                        out.push(ch);
                        rest = &candidate[end + 2..];
                    }
                    None => {
                        out.push('&');
                        rest = &candidate[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "euro" => Some('€'),
        "pound" => Some('£'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "hellip" => Some('…'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_separated() {
        let html = "<body><h1>Title</h1><p>First</p><div>Second<br>Third</div></body>";
        assert_eq!(extract_text(html), "Title First Second Third");
    }

    #[test]
    fn test_inline_elements_do_not_add_spaces() {
        let html = "<p>Price: <b>$1</b>0</p>";
        assert_eq!(extract_text(html), "Price: $1 0");
    }

    #[test]
    fn test_chrome_and_scripts_are_skipped() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head>
            <body><nav>Home | About</nav><header>Logo</header>
            <div role="search">Search</div>
            <main><p>Content</p><script>var x = 1;</script></main>
            <footer>(c) 2024</footer></body></html>"#;
        assert_eq!(extract_text(html), "Content");
    }

    #[test]
    fn test_without_body_uses_document() {
        assert_eq!(extract_text("Just <em>some</em>   text"), "Just some text");
    }

    #[test]
    fn test_entities() {
        assert_eq!(extract_text("<p>Fish &amp; Chips &#8212; &#x41;&lt;</p>"), "Fish & Chips — A<");
        assert_eq!(decode_entities("a & b; &unknown; &amp"), "a & b; &unknown; &amp");
    }
}
