//! Flatten computed style into inline `style` attributes.

use crate::dom::{LiveDom, NodeId, NodeKind};
use crate::rendering::ComputedStyle;

/// `prop:val;` for every resolved property whose value has no url reference.
pub fn style_text(style: &ComputedStyle) -> String {
    style
        .iter()
        .filter(|(_, value)| !value.contains("url("))
        .map(|(name, value)| format!("{}:{};", name, value))
        .collect()
}

fn subtree_elements<D: LiveDom + ?Sized>(dom: &D, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if dom.node_kind(node) != Some(NodeKind::Element) {
            continue;
        }
        out.push(node);
        stack.extend(dom.element_children(node).into_iter().rev());
    }
    out
}

/// Replace the `style` attribute of `root` and every element below it with
/// its computed style.
///
/// All styles are read from one consistent snapshot before the first write.
pub fn inline_computed_styles<D: LiveDom + ?Sized>(dom: &mut D, root: NodeId) {
    let resolved: Vec<(NodeId, String)> = subtree_elements(dom, root)
        .into_iter()
        .filter_map(|node| Some((node, style_text(&dom.computed_style(node)?))))
        .collect();
    for (node, text) in &resolved {
        dom.set_attribute(*node, "style", text);
    }
    log::debug!("inlined computed style on {} elements", resolved.len());
}
