//! Capability trait the segmentation engine runs against.
//!
//! A host only has to expose tree access, attribute mutation, node
//! replacement, selector queries, a computed-style query and a geometry
//! query. The engine never
//! depends on a concrete document type, so a browser-backed binding can
//! implement this trait alongside [`crate::dom::Document`].

use super::{NodeId, Selector};
use crate::rendering::css::Declarations;
use crate::rendering::{ComputedStyle, Rect};

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Document, doctype, comment and anything else without content policy
    Other,
}

/// A rendered document owned by a host and mutated in place.
///
/// All methods must tolerate stale or detached ids: queries return `None`,
/// empty collections or a zero rectangle and mutations do nothing.
pub trait LiveDom {
    fn root(&self) -> NodeId;

    fn body(&self) -> Option<NodeId>;

    /// `None` when the id does not name a node
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    fn is_connected(&self, node: NodeId) -> bool;

    /// Lower-case tag name of an element
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Attribute names of an element, in source order
    fn attribute_names(&self, node: NodeId) -> Vec<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Data of a text node
    fn text(&self, node: NodeId) -> Option<&str>;

    fn set_text(&mut self, node: NodeId, text: &str);

    fn text_content(&self, node: NodeId) -> String;

    fn set_text_content(&mut self, node: NodeId, text: &str);

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool;

    /// Swap `new` into the tree position of `old`.
    fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool;

    fn remove_node(&mut self, node: NodeId) -> bool;

    /// Fully resolved style after cascade, inheritance and layout.
    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle>;

    /// Border box in viewport coordinates.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    fn outer_html(&self, node: NodeId) -> String;

    /// Descendants of `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|c| self.node_kind(*c) == Some(NodeKind::Element))
            .collect()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.node_kind(node) != Some(NodeKind::Element) || self.has_class(node, class) {
            return;
        }
        let classes = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes);
    }

    /// Parsed `style` attribute.
    fn inline_style(&self, node: NodeId) -> Declarations {
        Declarations::parse(self.attribute(node, "style").unwrap_or(""))
    }

    /// Set one inline declaration, keeping the rest of the `style` attribute.
    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str, important: bool) {
        if self.node_kind(node) != Some(NodeKind::Element) {
            return;
        }
        let mut decls = self.inline_style(node);
        decls.set(name, value, important);
        let text = decls.to_css_text();
        self.set_attribute(node, "style", &text);
    }
}
