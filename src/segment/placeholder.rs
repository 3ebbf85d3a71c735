//! Script removal and media placeholders.

use crate::dom::{LiveDom, NodeId, NodeKind, Selector};
use crate::rendering::computed::format_px;
use crate::rendering::Rect;
use std::sync::LazyLock;

/// Marker class carried by every placeholder box.
pub const PLACEHOLDER_CLASS: &str = "placeholder-media";

/// Label of a fresh placeholder.
pub const IMAGE_LABEL: &str = "IMAGE";

/// Elements replaced wholesale by the document-wide media pass.
pub const MEDIA_TAGS: [&str; 9] = [
    "img", "video", "svg", "canvas", "picture", "embed", "object", "iframe", "audio",
];

// Never replaced for carrying a background image: swapping these out would
// take the whole page with them.
const STRUCTURAL_TAGS: [&str; 3] = ["html", "head", "body"];

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid script selector"));

static ANY_ELEMENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").expect("valid universal selector"));

/// Build a detached placeholder box of the given size.
pub fn create_placeholder<D: LiveDom + ?Sized>(dom: &mut D, label: &str, size: Rect, underline: bool) -> NodeId {
    let ph = dom.create_element("div");
    dom.add_class(ph, PLACEHOLDER_CLASS);
    dom.set_text_content(ph, label);
    let width = format_px(size.width);
    let height = format_px(size.height);
    let mut decls = vec![
        ("width", width.as_str()),
        ("height", height.as_str()),
        ("display", "flex"),
        ("align-items", "center"),
        ("justify-content", "center"),
        ("background", "#888"),
        ("color", "#fff"),
        ("font-size", "0.9em"),
    ];
    if underline {
        decls.push(("text-decoration", "underline"));
    }
    for (name, value) in decls {
        dom.set_style_property(ph, name, value, true);
    }
    ph
}

pub fn is_placeholder<D: LiveDom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.has_class(node, PLACEHOLDER_CLASS)
}

/// Detach every `<script>` element. Returns how many were removed.
pub fn remove_scripts<D: LiveDom + ?Sized>(dom: &mut D) -> usize {
    let scripts = dom.query_selector_all(dom.root(), &SCRIPT_SELECTOR);
    let count = scripts.len();
    for script in scripts {
        dom.remove_node(script);
    }
    count
}

/// Nodes the media pass replaces: media tags plus any element whose
/// computed background image references a url, each once, in document order.
pub fn media_targets<D: LiveDom + ?Sized>(dom: &D) -> Vec<NodeId> {
    dom.query_selector_all(dom.root(), &ANY_ELEMENT)
        .into_iter()
        .filter(|n| dom.node_kind(*n) == Some(NodeKind::Element))
        .filter(|n| {
            let tag = dom.tag_name(*n).unwrap_or("");
            if MEDIA_TAGS.contains(&tag) {
                return true;
            }
            !STRUCTURAL_TAGS.contains(&tag)
                && dom
                    .computed_style(*n)
                    .is_some_and(|style| style.has_background_url())
        })
        .collect()
}

/// Swap every media target for a placeholder of its measured size.
///
/// All boxes are measured before the first replacement, so the order of
/// replacement has no effect on sizes. Returns the number of replacements.
pub fn replace_media<D: LiveDom + ?Sized>(dom: &mut D) -> usize {
    let measured: Vec<(NodeId, Rect)> = media_targets(dom)
        .into_iter()
        .map(|n| (n, dom.bounding_rect(n)))
        .collect();
    let mut replaced = 0;
    for (node, rect) in measured {
        // nested targets go away with their replaced ancestor
        if !dom.is_connected(node) {
            continue;
        }
        let ph = create_placeholder(dom, IMAGE_LABEL, rect, false);
        if dom.replace_node(node, ph) {
            replaced += 1;
        }
    }
    replaced
}

/// Whole-document cleanup run once before detection.
pub fn clean_document<D: LiveDom + ?Sized>(dom: &mut D) {
    let scripts = remove_scripts(dom);
    let media = replace_media(dom);
    log::debug!("removed {} scripts, replaced {} media elements", scripts, media);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::Viewport;

    fn doc(html: &str) -> Document {
        Document::parse(html, Viewport::default())
    }

    fn placeholders(d: &Document) -> Vec<NodeId> {
        d.select(d.root(), &Selector::parse(".placeholder-media").unwrap())
    }

    #[test]
    fn placeholder_carries_visual_contract() {
        let mut d = doc("<html><body></body></html>");
        let ph = create_placeholder(&mut d, "IMAGE", Rect::new(0.0, 0.0, 120.5, 40.0), true);
        let style = d.attr(ph, "style").unwrap().to_string();
        assert!(style.contains("width:120.5px !important;"));
        assert!(style.contains("height:40px !important;"));
        assert!(style.contains("display:flex !important;"));
        assert!(style.contains("background:#888 !important;"));
        assert!(style.contains("text-decoration:underline !important;"));
        assert_eq!(d.text_content(ph), "IMAGE");
        assert!(is_placeholder(&d, ph));
    }

    #[test]
    fn scripts_are_removed_everywhere() {
        let mut d = doc("<html><head><script>a()</script></head><body><div><script src=x></script></div></body></html>");
        assert_eq!(remove_scripts(&mut d), 2);
        assert!(!d.descendants(d.root()).into_iter().any(|n| d.element(n).is_some_and(|e| e.name == "script")));
    }

    #[test]
    fn media_are_replaced_at_measured_size() {
        let mut d = doc(r#"<html><body style="margin:0">
            <img src="a.png" width="64" height="32">
            <p><video></video></p>
            <div style="background-image: url(bg.png); width: 200px; height: 50px"></div>
            <div style="background: none"></div>
        </body></html>"#);
        assert_eq!(replace_media(&mut d), 3);
        let phs = placeholders(&d);
        assert_eq!(phs.len(), 3);
        assert_eq!(d.bounding_rect(phs[0]).width, 64.0);
        assert_eq!(d.bounding_rect(phs[0]).height, 32.0);
        assert_eq!(d.bounding_rect(phs[1]).width, 300.0);
        assert_eq!(d.bounding_rect(phs[2]).width, 200.0);
        let html = d.outer_html(d.root());
        assert!(!html.contains("<img") && !html.contains("<video") && !html.contains("url("));
    }

    #[test]
    fn nested_media_are_replaced_once() {
        let mut d = doc(r#"<html><body><picture><img src="a.png"></picture></body></html>"#);
        assert_eq!(replace_media(&mut d), 1);
        assert_eq!(placeholders(&d).len(), 1);
    }

    #[test]
    fn body_background_is_left_alone() {
        let mut d = doc(r#"<html><body style="background: url(x.png)"><p>hi</p></body></html>"#);
        assert_eq!(replace_media(&mut d), 0);
        assert!(d.body().is_some());
    }
}
