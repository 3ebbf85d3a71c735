//! HTML parsing via `scraper` (html5ever), copied into the mutable arena.

use super::{Document, ElementData, NodeData, NodeId};
use crate::Viewport;
use ego_tree::NodeRef;
use scraper::{Html, Node};

impl Document {
    /// Parse a full HTML document. Parsing never fails; html5ever recovers
    /// from malformed input the way browsers do.
    pub fn parse(html: &str, viewport: Viewport) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new(viewport);
        let root = doc.root();
        for child in parsed.tree.root().children() {
            copy_subtree(&mut doc, root, child);
        }
        log::debug!("parsed document: {} nodes", doc.nodes.len());
        doc
    }
}

fn copy_subtree(doc: &mut Document, parent: NodeId, src: NodeRef<'_, Node>) {
    let data = match src.value() {
        Node::Element(el) => {
            let mut data = ElementData::new(el.name());
            for (name, value) in el.attrs() {
                data.set_attr(name, value);
            }
            NodeData::Element(data)
        }
        Node::Text(text) => NodeData::Text(String::from(&**text)),
        Node::Comment(comment) => NodeData::Comment(String::from(&**comment)),
        Node::Doctype(doctype) => NodeData::Doctype(doctype.name().to_string()),
        // fragments and processing instructions carry no content of interest
        _ => {
            for child in src.children() {
                copy_subtree(doc, parent, child);
            }
            return;
        }
    };
    let id = doc.create_node(data);
    doc.append_child(parent, id);
    for child in src.children() {
        copy_subtree(doc, id, child);
    }
}
