//! Recursive per-element content policy.
//!
//! Every element falls into exactly one [`ElementKind`]; each kind has its own
//! handler. Anchors and media are terminal, everything else recurses.

use super::anonymize::anonymize_text;
use super::placeholder::{create_placeholder, is_placeholder, IMAGE_LABEL};
use crate::dom::{LiveDom, NodeId, NodeKind};

/// Label an ordinary link is reduced to.
pub const LINK_LABEL: &str = "Link";

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Media replaced during sanitization when the document pass has not
/// already done so.
const INLINE_MEDIA: [&str; 2] = ["img", "video"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Already replaced; never touched again
    Placeholder,
    Anchor,
    Media,
    Heading,
    Container,
}

impl ElementKind {
    /// `None` for text, comments, detached and unknown nodes.
    pub fn classify<D: LiveDom + ?Sized>(dom: &D, node: NodeId) -> Option<Self> {
        if dom.node_kind(node) != Some(NodeKind::Element) || !dom.is_connected(node) {
            return None;
        }
        if is_placeholder(dom, node) {
            return Some(Self::Placeholder);
        }
        let tag = dom.tag_name(node)?;
        Some(match tag {
            "a" => Self::Anchor,
            t if INLINE_MEDIA.contains(&t) => Self::Media,
            t if HEADINGS.contains(&t) => Self::Heading,
            _ => Self::Container,
        })
    }
}

/// Sanitize the subtree rooted at `node` in place.
///
/// Returns the node now occupying `node`'s position: the placeholder when
/// `node` itself was replaced, otherwise `node`.
///
/// Placeholders, detached nodes and non-elements are left alone, so running
/// this twice over the same subtree changes nothing the second time.
pub fn sanitize_subtree<D: LiveDom + ?Sized>(dom: &mut D, node: NodeId) -> NodeId {
    let Some(kind) = ElementKind::classify(dom, node) else {
        return node;
    };
    match kind {
        ElementKind::Placeholder => node,
        ElementKind::Anchor => sanitize_anchor(dom, node),
        ElementKind::Media => replace_with_placeholder(dom, node, node, false),
        ElementKind::Heading => {
            sanitize_container(dom, node, false);
            node
        }
        ElementKind::Container => {
            sanitize_container(dom, node, true);
            node
        }
    }
}

/// An anchor wrapping nothing but an image, or the placeholder that already
/// stands in for one.
fn image_link_target<D: LiveDom + ?Sized>(dom: &D, anchor: NodeId) -> Option<NodeId> {
    match dom.element_children(anchor).as_slice() {
        [only] if dom.tag_name(*only) == Some("img") || is_placeholder(dom, *only) => Some(*only),
        _ => None,
    }
}

fn sanitize_anchor<D: LiveDom + ?Sized>(dom: &mut D, anchor: NodeId) -> NodeId {
    if let Some(image) = image_link_target(dom, anchor) {
        return replace_with_placeholder(dom, anchor, image, true);
    }

    let already_labelled = dom.children(anchor).len() == 1 && dom.text_content(anchor) == LINK_LABEL;
    if !already_labelled {
        dom.set_text_content(anchor, LINK_LABEL);
    }
    dom.set_attribute(anchor, "href", "");
    dom.set_style_property(anchor, "text-decoration", "none", true);
    for name in dom.attribute_names(anchor) {
        if name.starts_with("on") {
            dom.remove_attribute(anchor, &name);
        }
    }
    anchor
}

/// Replace `node` with a placeholder sized to `measure`'s box.
///
/// Returns the placeholder, or `node` when the swap did not happen.
fn replace_with_placeholder<D: LiveDom + ?Sized>(
    dom: &mut D,
    node: NodeId,
    measure: NodeId,
    underline: bool,
) -> NodeId {
    let rect = dom.bounding_rect(measure);
    let ph = create_placeholder(dom, IMAGE_LABEL, rect, underline);
    if dom.replace_node(node, ph) {
        ph
    } else {
        node
    }
}

fn sanitize_container<D: LiveDom + ?Sized>(dom: &mut D, node: NodeId, clear_emphasis: bool) {
    if clear_emphasis {
        dom.set_style_property(node, "font-style", "normal", true);
        dom.set_style_property(node, "font-weight", "normal", true);
        dom.set_style_property(node, "text-decoration", "none", true);
    }

    let inline = dom.inline_style(node);
    let has_image = inline.value("background-image").is_some_and(|v| v != "none")
        || inline.value("background").is_some_and(|v| v.contains("url("));
    if has_image {
        dom.set_style_property(node, "background-image", "none", false);
    }

    for child in dom.children(node) {
        match dom.node_kind(child) {
            Some(NodeKind::Text) => {
                let replacement = dom.text(child).and_then(anonymize_text);
                if let Some(text) = replacement {
                    dom.set_text(child, &text);
                }
            }
            Some(NodeKind::Element) => {
                sanitize_subtree(dom, child);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Selector};
    use crate::Viewport;

    fn doc(html: &str) -> Document {
        Document::parse(html, Viewport::default())
    }

    fn first(d: &Document, sel: &str) -> NodeId {
        d.select(d.root(), &Selector::parse(sel).unwrap())[0]
    }

    #[test]
    fn classification() {
        let d = doc(r#"<a id=a></a><img id=i><h3 id=h></h3><section id=s></section><div id=p class="placeholder-media"></div>"#);
        assert_eq!(ElementKind::classify(&d, first(&d, "#a")), Some(ElementKind::Anchor));
        assert_eq!(ElementKind::classify(&d, first(&d, "#i")), Some(ElementKind::Media));
        assert_eq!(ElementKind::classify(&d, first(&d, "#h")), Some(ElementKind::Heading));
        assert_eq!(ElementKind::classify(&d, first(&d, "#s")), Some(ElementKind::Container));
        assert_eq!(ElementKind::classify(&d, first(&d, "#p")), Some(ElementKind::Placeholder));
        assert_eq!(ElementKind::classify(&d, d.root()), None);
    }

    #[test]
    fn text_link_becomes_neutral_link() {
        let mut d = doc(r#"<body><div><a href="https://secret/path" onclick="steal()" onerror="x()" onmouseover="y()" class="btn">Click <b>here</b></a></div></body>"#);
        let div = first(&d, "div");
        sanitize_subtree(&mut d, div);
        let a = first(&d, "a");
        assert_eq!(d.text_content(a), "Link");
        assert_eq!(d.attr(a, "href"), Some(""));
        assert_eq!(d.attr(a, "onclick"), None);
        assert_eq!(d.attr(a, "onerror"), None);
        assert_eq!(d.attr(a, "onmouseover"), None);
        assert_eq!(d.attr(a, "class"), Some("btn"));
        assert_eq!(d.computed_style(a).unwrap().get("text-decoration"), Some("none"));
    }

    #[test]
    fn image_link_collapses_to_underlined_placeholder() {
        let mut d = doc(r#"<body><div><a href="https://x" title="t"><img src="p.png" width="80" height="20"></a></div></body>"#);
        let div = first(&d, "div");
        sanitize_subtree(&mut d, div);
        let kids = d.children(div).to_vec();
        assert_eq!(kids.len(), 1);
        let ph = kids[0];
        assert!(is_placeholder(&d, ph));
        assert_eq!(d.text_content(ph), "IMAGE");
        assert_eq!(d.attr(ph, "href"), None);
        assert_eq!(d.attr(ph, "title"), None);
        let style = d.computed_style(ph).unwrap();
        assert_eq!(style.get("text-decoration"), Some("underline"));
        assert_eq!(d.bounding_rect(ph).width, 80.0);
    }

    #[test]
    fn replaced_root_hands_back_its_placeholder() {
        let mut d = doc(r#"<body><a id=a href="https://x" onclick="t()"><img width="50" height="50"></a><p id=p>Two words</p></body>"#);
        let a = first(&d, "#a");
        let slot = sanitize_subtree(&mut d, a);
        assert_ne!(slot, a);
        assert!(!d.is_connected(a));
        assert!(is_placeholder(&d, slot));
        assert_eq!(d.bounding_rect(slot).height, 50.0);

        let p = first(&d, "#p");
        assert_eq!(sanitize_subtree(&mut d, p), p);
    }

    #[test]
    fn anchor_around_existing_placeholder_is_an_image_link() {
        let mut d = doc(r#"<body><div><a href="/"> <div class="placeholder-media">IMAGE</div> </a></div></body>"#);
        let div = first(&d, "div");
        sanitize_subtree(&mut d, div);
        let ph = d.element_children(div)[0];
        assert!(is_placeholder(&d, ph));
        assert!(d.attr(ph, "style").unwrap().contains("underline"));
    }

    #[test]
    fn containers_lose_emphasis_headings_keep_it() {
        let mut d = doc(r#"<body><section><h2>Big Title Here Now</h2><em>Some emphasised words here</em></section></body>"#);
        let section = first(&d, "section");
        sanitize_subtree(&mut d, section);
        let h2 = first(&d, "h2");
        let em = first(&d, "em");
        assert_eq!(d.computed_style(h2).unwrap().get("font-weight"), Some("700"));
        assert_eq!(d.computed_style(em).unwrap().get("font-style"), Some("normal"));
        assert_eq!(d.computed_style(em).unwrap().get("font-weight"), Some("400"));
        assert_eq!(d.text_content(h2), "Lorem ipsum dolor sit ");
        assert_eq!(d.text_content(em), "Lorem ipsum dolor sit ");
        assert!(d.attr(h2, "style").is_none());
    }

    #[test]
    fn inline_background_images_are_cleared() {
        let mut d = doc(r#"<body><div style="background-image: url(a.png)">x</div></body>"#);
        let div = first(&d, "div");
        sanitize_subtree(&mut d, div);
        assert_eq!(d.inline_style(div).value("background-image"), Some("none"));
        assert!(!d.computed_style(div).unwrap().has_background_url());
    }

    #[test]
    fn media_become_placeholders() {
        let mut d = doc(r#"<body><div><video></video><p>One two</p></div></body>"#);
        let div = first(&d, "div");
        sanitize_subtree(&mut d, div);
        let kids = d.element_children(div);
        assert!(is_placeholder(&d, kids[0]));
        assert_eq!(d.text_content(kids[1]), "Text ");
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut d = doc(r#"<body><main><h1>Welcome to the shop</h1><p>Buy our products today, friends!</p>
            <a href="/x">More</a><a href="/y"><img src="y.png"></a><span>ok</span></main></body>"#);
        let main = first(&d, "main");
        sanitize_subtree(&mut d, main);
        let once = d.outer_html(main);
        sanitize_subtree(&mut d, main);
        assert_eq!(d.outer_html(main), once);
    }

    #[test]
    fn detached_nodes_are_ignored() {
        let mut d = doc(r#"<body><p>Some real words here</p></body>"#);
        let p = first(&d, "p");
        d.remove_node(p);
        sanitize_subtree(&mut d, p);
        assert_eq!(d.text_content(p), "Some real words here");
        let root = d.root();
        sanitize_subtree(&mut d, root);
    }
}
