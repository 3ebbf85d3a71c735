//! Mutable arena DOM used as the in-process rendering host.
//!
//! Nodes are addressed by [`NodeId`] and never freed: removing or replacing a
//! node only detaches it, so stale ids stay valid but report as disconnected.
//! Computed styles and layout are derived lazily and cached until the next
//! mutation.

pub mod live;
pub mod parse;
pub mod selector;
pub mod serialize;

pub use live::{LiveDom, NodeKind};
pub use selector::{Selector, SelectorError};

use crate::rendering::{self, ComputedStyle, Rect, Rendered};
use crate::Viewport;
use std::cell::RefCell;
use std::rc::Rc;

/// ID used to address nodes in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Comment(String),
    Text(String),
    Element(ElementData),
}

/// Tag name plus ordered attributes. Names are stored lower-case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before != self.attrs.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A parsed, mutable HTML document with lazily computed style and layout.
pub struct Document {
    nodes: Vec<Node>,
    viewport: Viewport,
    rendered: RefCell<Option<Rc<Rendered>>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            viewport,
            rendered: RefCell::new(None),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id)? {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.invalidate();
        match self.nodes.get_mut(id.0).map(|n| &mut n.data)? {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// True when the node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        let mut cur = id;
        loop {
            if cur == self.root() {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// First element child of the root (`<html>`).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some())
    }

    fn child_element_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some_and(|e| e.name == name))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, "body")
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        self.push(data)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.nodes.get_mut(parent.0) {
                p.children.retain(|c| *c != id);
            }
        }
        if let Some(n) = self.nodes.get_mut(id.0) {
            n.parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent.0 >= self.nodes.len() || child.0 >= self.nodes.len() || parent == child {
            return false;
        }
        // refuse to create cycles
        let mut cur = Some(parent);
        while let Some(c) = cur {
            if c == child {
                return false;
            }
            cur = self.parent(c);
        }
        self.invalidate();
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        true
    }

    /// Put `new` into the slot occupied by `old`; `old` ends up detached.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if new.0 >= self.nodes.len() || old == new {
            return false;
        }
        self.invalidate();
        self.detach(new);
        let Some(pos) = self.nodes[parent.0].children.iter().position(|c| *c == old) else {
            return false;
        };
        self.nodes[parent.0].children[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        true
    }

    /// Detach a node from its parent.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.parent(id).is_none() {
            return false;
        }
        self.invalidate();
        self.detach(id);
        true
    }

    /// Replace all children of an element with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        match self.data(id) {
            Some(NodeData::Element(_)) | Some(NodeData::Document) => {}
            Some(NodeData::Text(_)) => {
                self.set_text(id, text);
                return;
            }
            _ => return,
        }
        self.invalidate();
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let t = self.create_text(text);
            self.nodes[t.0].parent = Some(id);
            self.nodes[id.0].children.push(t);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeData::Text(t)) = self.data(id) {
            return t.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                Some(NodeData::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Overwrite the data of a text node. No-op for other node types.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(Node { data: NodeData::Text(t), .. }) = self.nodes.get_mut(id.0) {
            if t != text {
                *t = text.to_string();
                self.rendered.replace(None);
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if self.attr(id, name) == Some(value) {
            return;
        }
        if let Some(e) = self.element_mut(id) {
            e.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if self.attr(id, name).is_none() {
            return;
        }
        if let Some(e) = self.element_mut(id) {
            e.remove_attr(name);
        }
    }

    /// Descendants of `scope` matching `selector`, in document order.
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    /// Cached style + layout snapshot, recomputed after any mutation.
    pub fn rendered(&self) -> Rc<Rendered> {
        if let Some(r) = self.rendered.borrow().as_ref() {
            return Rc::clone(r);
        }
        let fresh = Rc::new(rendering::render(self));
        self.rendered.replace(Some(Rc::clone(&fresh)));
        fresh
    }

    pub fn computed_style(&self, id: NodeId) -> Option<ComputedStyle> {
        if !self.is_connected(id) {
            return None;
        }
        self.rendered().style(id).cloned()
    }

    pub fn bounding_rect(&self, id: NodeId) -> Rect {
        if !self.is_connected(id) {
            return Rect::default();
        }
        self.rendered().rect(id)
    }

    fn invalidate(&self) {
        self.rendered.replace(None);
    }
}

impl LiveDom for Document {
    fn root(&self) -> NodeId {
        Document::root(self)
    }

    fn body(&self) -> Option<NodeId> {
        Document::body(self)
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        Some(match self.data(node)? {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            _ => NodeKind::Other,
        })
    }

    fn is_connected(&self, node: NodeId) -> bool {
        Document::is_connected(self, node)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.name.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Document::parent(self, node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        Document::children(self, node).to_vec()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attr(node, name)
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(|e| e.attrs.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.set_attr(node, name, value)
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.remove_attr(node, name)
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        Document::set_text(self, node, text)
    }

    fn text_content(&self, node: NodeId) -> String {
        Document::text_content(self, node)
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        Document::set_text_content(self, node, text)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        Document::create_element(self, tag)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        Document::append_child(self, parent, child)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        Document::create_text(self, text)
    }

    fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        Document::replace_node(self, old, new)
    }

    fn remove_node(&mut self, node: NodeId) -> bool {
        Document::remove_node(self, node)
    }

    fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.select(scope, selector)
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        Document::computed_style(self, node)
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        Document::bounding_rect(self, node)
    }

    fn outer_html(&self, node: NodeId) -> String {
        serialize::outer_html(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        Document::parse(html, Viewport::default())
    }

    #[test]
    fn replace_detaches_old_node() {
        let mut d = doc("<html><body><p id=a>one</p><p id=b>two</p></body></html>");
        let body = d.body().unwrap();
        let a = d.children(body)[0];
        let span = d.create_element("span");
        assert!(d.replace_node(a, span));
        assert_eq!(d.children(body)[0], span);
        assert!(!d.is_connected(a));
        assert!(d.is_connected(span));
        // a detached node cannot be replaced again
        let other = d.create_element("i");
        assert!(!d.replace_node(a, other));
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut d = doc("<html><body><a href=x>Click <b>here</b></a></body></html>");
        let a = d.children(d.body().unwrap())[0];
        d.set_text_content(a, "Link");
        assert_eq!(d.children(a).len(), 1);
        assert_eq!(d.text_content(a), "Link");
    }

    #[test]
    fn append_child_refuses_cycles() {
        let mut d = doc("<html><body><div><p></p></div></body></html>");
        let div = d.children(d.body().unwrap())[0];
        let p = d.children(div)[0];
        assert!(!d.append_child(p, div));
        assert!(!d.append_child(div, div));
        assert_eq!(d.parent(p), Some(div));
    }

    #[test]
    fn attribute_helpers() {
        let mut d = doc(r#"<html><body><div class="a b" ONCLICK="x()"></div></body></html>"#);
        let div = d.children(d.body().unwrap())[0];
        assert!(d.element(div).unwrap().has_class("b"));
        assert_eq!(d.attr(div, "onclick"), Some("x()"));
        d.remove_attr(div, "onclick");
        assert_eq!(d.attr(div, "onclick"), None);
        d.set_attr(div, "class", "a b c");
        assert!(d.element(div).unwrap().has_class("c"));
    }

    #[test]
    fn invalid_ids_are_inert() {
        let mut d = doc("<html><body></body></html>");
        let bogus = NodeId(10_000);
        assert!(!d.is_connected(bogus));
        assert!(d.children(bogus).is_empty());
        assert_eq!(d.bounding_rect(bogus), Rect::default());
        assert!(d.computed_style(bogus).is_none());
        assert!(!d.remove_node(bogus));
        d.set_attr(bogus, "x", "y");
    }
}
