//! Placeholder label compaction for crowded segments.

use super::placeholder::{IMAGE_LABEL, PLACEHOLDER_CLASS};
use crate::dom::{LiveDom, NodeId, Selector};
use crate::rendering::Rect;
use std::sync::LazyLock;

/// Label used once any two placeholders in a segment overlap.
pub const COMPACT_LABEL: &str = "I";

static PLACEHOLDERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!(".{}", PLACEHOLDER_CLASS)).expect("valid placeholder selector")
});

/// True when any two boxes overlap on both axes (touching edges do not).
pub fn any_collision(rects: &[Rect]) -> bool {
    rects
        .iter()
        .enumerate()
        .any(|(i, a)| rects[i + 1..].iter().any(|b| a.intersects(b)))
}

/// Shorten every `IMAGE` placeholder label under `root` to `I` when any two
/// placeholders collide. Returns whether compaction happened.
pub fn compact_placeholders<D: LiveDom + ?Sized>(dom: &mut D, root: NodeId) -> bool {
    let placeholders: Vec<NodeId> = dom.query_selector_all(root, &PLACEHOLDERS);
    let rects: Vec<Rect> = placeholders.iter().map(|p| dom.bounding_rect(*p)).collect();
    if !any_collision(&rects) {
        return false;
    }
    for ph in placeholders {
        if dom.text_content(ph).trim() == IMAGE_LABEL {
            dom.set_text_content(ph, COMPACT_LABEL);
        }
    }
    log::debug!("compacted {} placeholder labels", rects.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::Viewport;

    fn labels(d: &Document, root: NodeId) -> Vec<String> {
        d.select(root, &PLACEHOLDERS).into_iter().map(|p| d.text_content(p)).collect()
    }

    fn section(d: &Document) -> NodeId {
        d.select(d.root(), &Selector::parse("section").unwrap())[0]
    }

    #[test]
    fn collision_is_strict_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        let c = Rect::new(100.0, 0.0, 100.0, 100.0);
        assert!(any_collision(&[a, b]));
        assert!(!any_collision(&[a, c]));
        assert!(!any_collision(&[a]));
        assert!(!any_collision(&[]));
    }

    #[test]
    fn overlapping_placeholders_relabel_the_whole_segment() {
        let mut d = Document::parse(
            r#"<body style="margin:0"><section style="position:relative">
                <div class="placeholder-media" style="position:absolute;left:0;top:0;width:100px;height:100px">IMAGE</div>
                <div class="placeholder-media" style="position:absolute;left:50px;top:50px;width:100px;height:100px">IMAGE</div>
                <div class="placeholder-media" style="position:absolute;left:500px;top:0;width:10px;height:10px">IMAGE</div>
            </section></body>"#,
            Viewport::default(),
        );
        let root = section(&d);
        assert!(compact_placeholders(&mut d, root));
        assert_eq!(labels(&d, root), ["I", "I", "I"]);
    }

    #[test]
    fn separate_placeholders_keep_their_label() {
        let mut d = Document::parse(
            r#"<body><section>
                <div class="placeholder-media" style="width:100px;height:100px">IMAGE</div>
                <div class="placeholder-media" style="width:100px;height:100px">IMAGE</div>
            </section></body>"#,
            Viewport::default(),
        );
        let root = section(&d);
        assert!(!compact_placeholders(&mut d, root));
        assert_eq!(labels(&d, root), ["IMAGE", "IMAGE"]);
    }
}
