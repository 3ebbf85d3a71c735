//! Style and layout pipeline behind the arena DOM.
//!
//! [`render`] gathers the document's `<style>` sheets, runs the cascade and
//! lays out the result against the document viewport. The output is an
//! immutable [`Rendered`] snapshot that the DOM caches until it is mutated.

pub mod computed;
pub mod css;
pub mod layout;

pub use computed::ComputedStyle;
pub use layout::Rect;

use crate::dom::{Document, NodeData, NodeId};
use computed::{compute_styles, format_px};
use css::StyleSheet;
use layout::{layout_document, LayoutBox};
use std::collections::HashMap;

/// Computed styles and border boxes for every connected element.
#[derive(Debug, Default)]
pub struct Rendered {
    styles: HashMap<NodeId, ComputedStyle>,
    boxes: HashMap<NodeId, LayoutBox>,
}

impl Rendered {
    pub fn style(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&id)
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.boxes.get(&id).map(|b| b.rect).unwrap_or_default()
    }
}

/// Author stylesheet: every connected `<style>` element in document order.
pub fn document_stylesheet(doc: &Document) -> StyleSheet {
    let mut sheet = StyleSheet::empty();
    for node in doc.descendants(doc.root()) {
        let is_style = doc.element(node).is_some_and(|e| e.name == "style");
        if is_style {
            sheet.extend(StyleSheet::parse(&doc.text_content(node)));
        }
    }
    sheet
}

pub fn render(doc: &Document) -> Rendered {
    let sheet = document_stylesheet(doc);
    let mut styles = compute_styles(doc, &sheet);
    let boxes = layout_document(doc, &styles, doc.viewport());

    // width/height report used values once layout has run
    for (id, style) in styles.iter_mut() {
        let atomic = !matches!(style.display(), "inline" | "none")
            || matches!(doc.data(*id), Some(NodeData::Element(e)) if computed::REPLACED_TAGS.contains(&e.name.as_str()));
        let laid_out = boxes.get(id).filter(|_| atomic && style.display() != "none");
        match laid_out {
            Some(b) => {
                style.set("width", format_px(b.content_width));
                style.set("height", format_px(b.content_height));
            }
            None => {
                style.set("width", "auto".to_string());
                style.set("height", "auto".to_string());
            }
        }
    }
    log::debug!(
        "rendered {} styled elements with {} rules",
        styles.len(),
        sheet.rule_count()
    );
    Rendered { styles, boxes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;
    use crate::Viewport;

    #[test]
    fn used_sizes_replace_specified_ones() {
        let d = Document::parse(
            r#"<html><head><style>.box { width: 50%; padding: 5px }</style></head>
               <body style="margin:0"><div class="box">x</div><span id=s>y</span></body></html>"#,
            Viewport { width: 1000, height: 500 },
        );
        let sel = Selector::parse(".box").unwrap();
        let div = d.select(d.root(), &sel)[0];
        let style = d.computed_style(div).unwrap();
        assert_eq!(style.get("width"), Some("500px"));
        assert_eq!(style.get("padding-left"), Some("5px"));
        assert_eq!(d.bounding_rect(div).width, 510.0);

        let span = d.select(d.root(), &Selector::parse("#s").unwrap())[0];
        assert_eq!(d.computed_style(span).unwrap().get("width"), Some("auto"));
    }

    #[test]
    fn style_elements_in_body_apply() {
        let d = Document::parse(
            "<body><style>p { color: red }</style><p>x</p></body>",
            Viewport::default(),
        );
        assert_eq!(document_stylesheet(&d).rule_count(), 1);
        let p = d.select(d.root(), &Selector::parse("p").unwrap())[0];
        assert_eq!(d.computed_style(p).unwrap().get("color"), Some("red"));
    }
}
