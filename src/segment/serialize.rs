//! Per-candidate pipeline: sanitize, compact, inline, measure, emit.

use super::compact::compact_placeholders;
use super::detect::Candidate;
use super::inline::inline_computed_styles;
use super::sanitize::sanitize_subtree;
use super::{Segment, SegmentRect};
use crate::dom::LiveDom;

/// Run the full per-segment sequence on one candidate and serialize it.
pub fn serialize_segment<D: LiveDom + ?Sized>(dom: &mut D, candidate: Candidate) -> Segment {
    let Candidate { role, node } = candidate;
    if !dom.is_connected(node) {
        log::debug!("{} candidate {:?} was detached by an earlier segment", role, node);
    }

    // an image-link or media root is swapped for its placeholder
    let node = sanitize_subtree(dom, node);
    let compacted = compact_placeholders(dom, node);
    inline_computed_styles(dom, node);
    dom.set_style_property(node, "background-color", "#fff", true);
    dom.set_style_property(node, "box-sizing", "border-box", true);

    let rect = SegmentRect::from(dom.bounding_rect(node));
    dom.add_class(node, role.marker_class());
    log::debug!(
        "serialized {} segment at {:?} (compacted: {})",
        role,
        rect,
        compacted
    );
    Segment {
        role,
        rect,
        html: dom.outer_html(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId, Selector};
    use crate::segment::Role;
    use crate::Viewport;

    fn first(d: &Document, sel: &str) -> NodeId {
        d.select(d.root(), &Selector::parse(sel).unwrap())[0]
    }

    #[test]
    fn segment_root_is_marked_and_self_contained() {
        let mut d = Document::parse(
            r#"<html><head><style>header { padding: 10px; font-style: italic }</style></head>
               <body style="margin:0"><header onclick="x()"><a href="https://acme.example/">Home page</a><span>Acme Corporation International Ltd</span></header></body></html>"#,
            Viewport::default(),
        );
        let header = first(&d, "header");
        let seg = serialize_segment(&mut d, Candidate { role: Role::Header, node: header });

        assert_eq!(seg.role, Role::Header);
        assert!(seg.html.starts_with("<header"));
        assert!(seg.html.contains(r#"class="segment-header""#));
        assert!(seg.html.contains("background-color:#fff !important;"));
        assert!(seg.html.contains("box-sizing:border-box !important;"));
        assert!(seg.html.contains(">Link</a>"));
        assert!(seg.html.contains("Lorem ipsum dolor sit "));
        assert!(!seg.html.contains("acme"));
        assert!(!seg.html.contains("Acme"));
        assert!(!seg.html.contains("italic"));

        // border-box pulls the padding inside the pinned width
        assert_eq!(seg.rect.x, 0.0);
        assert_eq!(seg.rect.width, 1260.0);
        assert!(seg.rect.height > 0.0);
    }
}
