//! HTML serialization of arena subtrees.

use super::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "xmp", "iframe", "noembed", "noframes", "noscript"];

/// Serialize `id` including its own tags.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out, false);
    out
}

/// Serialize the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let raw = doc
        .element(id)
        .is_some_and(|e| RAW_TEXT_ELEMENTS.contains(&e.name.as_str()));
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, &mut out, raw);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String, raw_text: bool) {
    let Some(data) = doc.data(id) else { return };
    match data {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, out, false);
            }
        }
        NodeData::Doctype(name) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
            for child in doc.children(id) {
                write_node(doc, *child, out, raw);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;

    #[test]
    fn serializes_escaped_markup() {
        let d = Document::parse(
            r#"<div title='say "hi"'>a &lt; b<br><style>p > a {}</style></div>"#,
            Viewport::default(),
        );
        let div = d.children(d.body().unwrap())[0];
        assert_eq!(
            outer_html(&d, div),
            r#"<div title="say &quot;hi&quot;">a &lt; b<br><style>p > a {}</style></div>"#
        );
        assert_eq!(inner_html(&d, div), r#"a &lt; b<br><style>p > a {}</style>"#);
    }
}
