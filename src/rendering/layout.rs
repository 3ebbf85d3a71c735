/// Flow layout over computed styles.
///
/// Block boxes stack vertically, inline content wraps word by word using an
/// average glyph width of half the font size, `inline-block` and replaced
/// elements are placed as atoms, `display:flex` rows and table rows lay their
/// items out horizontally and absolutely positioned boxes are placed against
/// the nearest positioned ancestor. No margin collapsing, no floats.

use super::computed::{parse_length, ComputedStyle, REPLACED_TAGS};
use crate::dom::{Document, NodeData, NodeId};
use crate::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const GLYPH_WIDTH_FACTOR: f64 = 0.5;
const DEFAULT_REPLACED_WIDTH: f64 = 300.0;
const DEFAULT_REPLACED_HEIGHT: f64 = 150.0;

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Strict interior overlap on both axes; shared edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x && self.y < other.bottom() && self.bottom() > other.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxModel {
    pub margin: [f64; 4],
    pub border: [f64; 4],
    pub padding: [f64; 4],
}

impl BoxModel {
    fn horizontal(&self) -> f64 {
        self.border[1] + self.border[3] + self.padding[1] + self.padding[3]
    }

    fn vertical(&self) -> f64 {
        self.border[0] + self.border[2] + self.padding[0] + self.padding[2]
    }
}

/// Border box plus content size of one laid-out element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutBox {
    pub rect: Rect,
    pub content_width: f64,
    pub content_height: f64,
}

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Lay out every connected element of `doc`.
pub fn layout_document(
    doc: &Document,
    styles: &HashMap<NodeId, ComputedStyle>,
    viewport: Viewport,
) -> HashMap<NodeId, LayoutBox> {
    let vp = Rect::new(0.0, 0.0, viewport.width as f64, viewport.height as f64);
    let mut ctx = LayoutCtx {
        doc,
        styles,
        boxes: HashMap::new(),
        viewport: vp,
    };
    if let Some(html) = doc.document_element() {
        ctx.block(html, 0.0, 0.0, vp.width, None, vp);
    }
    ctx.boxes
}

struct LayoutCtx<'a> {
    doc: &'a Document,
    styles: &'a HashMap<NodeId, ComputedStyle>,
    boxes: HashMap<NodeId, LayoutBox>,
    viewport: Rect,
}

/// Inline formatting state for one run of inline-level content.
struct LineCursor {
    left: f64,
    width: f64,
    x: f64,
    y: f64,
    line_height: f64,
    used: bool,
}

impl LineCursor {
    fn new(left: f64, y: f64, width: f64) -> Self {
        Self {
            left,
            width,
            x: left,
            y,
            line_height: 0.0,
            used: false,
        }
    }

    fn break_line(&mut self) {
        self.y += self.line_height;
        self.x = self.left;
        self.line_height = 0.0;
    }

    /// Reserve `w`×`h` on the current line, wrapping first when needed.
    fn place(&mut self, w: f64, h: f64) -> Rect {
        if self.x > self.left && self.x + w > self.left + self.width {
            self.break_line();
        }
        let r = Rect::new(self.x, self.y, w, h);
        self.x += w;
        self.line_height = self.line_height.max(h);
        self.used = true;
        r
    }

    fn bottom(&self) -> f64 {
        self.y + self.line_height
    }
}

impl LayoutCtx<'_> {
    fn style(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&id)
    }

    fn tag(&self, id: NodeId) -> &str {
        self.doc.element(id).map(|e| e.name.as_str()).unwrap_or("")
    }

    fn is_replaced(&self, id: NodeId) -> bool {
        REPLACED_TAGS.contains(&self.tag(id))
    }

    fn display(&self, id: NodeId) -> &str {
        match self.doc.data(id) {
            Some(NodeData::Element(_)) => self.style(id).map(ComputedStyle::display).unwrap_or("none"),
            Some(NodeData::Text(_)) => "inline",
            _ => "none",
        }
    }

    fn is_out_of_flow(&self, id: NodeId) -> bool {
        self.style(id)
            .is_some_and(|s| matches!(s.position(), "absolute" | "fixed"))
    }

    fn is_block_level(&self, id: NodeId) -> bool {
        matches!(
            self.display(id),
            "block" | "list-item" | "flex" | "grid" | "table" | "table-row-group" | "table-row" | "table-cell"
        )
    }

    fn box_model(&self, s: &ComputedStyle, basis: f64) -> BoxModel {
        let mut bm = BoxModel::default();
        for (i, side) in SIDES.iter().enumerate() {
            bm.margin[i] = s.length(&format!("margin-{}", side), Some(basis)).unwrap_or(0.0);
            bm.border[i] = s.length(&format!("border-{}-width", side), None).unwrap_or(0.0);
            bm.padding[i] = s.length(&format!("padding-{}", side), Some(basis)).unwrap_or(0.0);
        }
        bm
    }

    /// Intrinsic size of a replaced element: attributes, then defaults.
    fn replaced_size(&self, id: NodeId) -> (f64, f64) {
        let attr = |name: &str| {
            self.doc
                .attr(id, name)
                .and_then(|v| parse_length(v, 16.0, None))
        };
        (
            attr("width").unwrap_or(DEFAULT_REPLACED_WIDTH),
            attr("height").unwrap_or(DEFAULT_REPLACED_HEIGHT),
        )
    }

    fn text_metrics(&self, parent: NodeId) -> (f64, f64, bool) {
        match self.style(parent) {
            Some(s) => {
                let nowrap = matches!(s.get("white-space"), Some("nowrap") | Some("pre"));
                (s.font_size() * GLYPH_WIDTH_FACTOR, s.line_height(), nowrap)
            }
            None => (8.0, 19.2, false),
        }
    }

    /// Widest line the content of `id` would need without wrapping.
    fn max_content_width(&self, id: NodeId) -> f64 {
        match self.doc.data(id) {
            Some(NodeData::Text(t)) => {
                let (glyph, _, _) = self.doc.parent(id).map(|p| self.text_metrics(p)).unwrap_or((8.0, 19.2, false));
                t.split_whitespace().map(|w| w.chars().count() + 1).sum::<usize>() as f64 * glyph
            }
            Some(NodeData::Element(_)) => {
                let Some(s) = self.style(id) else { return 0.0 };
                if s.display() == "none" {
                    return 0.0;
                }
                let bm = self.box_model(s, 0.0);
                let outer = bm.margin[1] + bm.margin[3] + bm.horizontal();
                if let Some(w) = s.length("width", None) {
                    return w + outer;
                }
                if self.is_replaced(id) {
                    return self.replaced_size(id).0 + outer;
                }
                let children = self.doc.children(id);
                let inner = if self.is_block_level(id) && !matches!(s.display(), "flex" | "table-row") {
                    // widest child; inline runs between blocks sum up
                    let mut widest: f64 = 0.0;
                    let mut run = 0.0;
                    for c in children {
                        if self.is_block_level(*c) {
                            widest = widest.max(run).max(self.max_content_width(*c));
                            run = 0.0;
                        } else {
                            run += self.max_content_width(*c);
                        }
                    }
                    widest.max(run)
                } else {
                    children.iter().map(|c| self.max_content_width(*c)).sum()
                };
                inner + outer
            }
            _ => 0.0,
        }
    }

    /// Zero boxes for a subtree that does not take part in layout.
    fn hide(&mut self, id: NodeId) {
        for n in std::iter::once(id).chain(self.doc.descendants(id)) {
            if self.doc.element(n).is_some() {
                self.boxes.insert(n, LayoutBox::default());
            }
        }
    }

    /// Lay out a block-level box whose margin edge starts at (`x`, `y`).
    /// `forced_width` fixes the margin-box width (flex items, shrink-to-fit).
    /// Returns the margin-box height.
    fn block(&mut self, id: NodeId, x: f64, y: f64, avail: f64, forced_width: Option<f64>, abs_cb: Rect) -> f64 {
        let Some(s) = self.style(id).cloned() else { return 0.0 };
        if s.display() == "none" {
            self.hide(id);
            return 0.0;
        }
        let bm = self.box_model(&s, avail);
        let border_box = s.get("box-sizing") == Some("border-box");

        let specified_width = s.length("width", Some(avail)).map(|w| {
            if border_box {
                (w - bm.horizontal()).max(0.0)
            } else {
                w
            }
        });
        let replaced = self.is_replaced(id);
        let content_width = match (specified_width, replaced) {
            (Some(w), _) => w,
            (None, true) => self.replaced_size(id).0,
            (None, false) => {
                let outer = forced_width.unwrap_or(avail);
                (outer - bm.margin[1] - bm.margin[3] - bm.horizontal()).max(0.0)
            }
        };

        let mut margin_left = bm.margin[3];
        // margin: auto centering for explicitly sized blocks
        if specified_width.is_some()
            && s.get("margin-left") == Some("auto")
            && s.get("margin-right") == Some("auto")
        {
            margin_left = ((avail - content_width - bm.horizontal()) / 2.0).max(0.0);
        }

        let bx = x + margin_left;
        let by = y + bm.margin[0];
        let cx = bx + bm.border[3] + bm.padding[3];
        let cy = by + bm.border[0] + bm.padding[0];

        let positioned = s.position() != "static";
        let child_abs_cb = if positioned {
            Rect::new(
                bx + bm.border[3],
                by + bm.border[0],
                content_width + bm.padding[1] + bm.padding[3],
                0.0,
            )
        } else {
            abs_cb
        };

        let children_height = if replaced {
            for c in self.doc.descendants(id) {
                if self.doc.element(c).is_some() {
                    self.boxes.insert(c, LayoutBox::default());
                }
            }
            0.0
        } else if matches!(s.display(), "flex" | "table-row")
            && !s.get("flex-direction").unwrap_or("row").starts_with("column")
        {
            self.row(id, cx, cy, content_width, child_abs_cb)
        } else {
            self.flow(id, cx, cy, content_width, child_abs_cb)
        };

        let content_height = match s.length("height", None) {
            Some(h) if border_box => (h - bm.vertical()).max(0.0),
            Some(h) => h,
            None if replaced => self.replaced_size(id).1,
            None => children_height,
        };

        let rect = Rect::new(bx, by, content_width + bm.horizontal(), content_height + bm.vertical());
        self.boxes.insert(
            id,
            LayoutBox {
                rect,
                content_width,
                content_height,
            },
        );
        bm.margin[0] + rect.height + bm.margin[2]
    }

    /// Normal flow: block children stack, inline children share line boxes.
    /// Returns the content height.
    fn flow(&mut self, parent: NodeId, x: f64, y: f64, width: f64, abs_cb: Rect) -> f64 {
        let mut cursor_y = y;
        let mut line: Option<LineCursor> = None;
        for child in self.doc.children(parent).to_vec() {
            if self.doc.element(child).is_some() && self.is_out_of_flow(child) {
                self.absolute(child, abs_cb);
                continue;
            }
            if self.is_block_level(child) {
                if let Some(l) = line.take() {
                    if l.used {
                        cursor_y = l.bottom();
                    }
                }
                cursor_y += self.block(child, x, cursor_y, width, None, abs_cb);
            } else {
                let l = line.get_or_insert_with(|| LineCursor::new(x, cursor_y, width));
                self.inline(child, parent, l, abs_cb);
            }
        }
        if let Some(l) = line {
            if l.used {
                cursor_y = l.bottom();
            }
        }
        cursor_y - y
    }

    /// Horizontal row: explicit widths first, remaining space shared equally.
    fn row(&mut self, parent: NodeId, x: f64, y: f64, width: f64, abs_cb: Rect) -> f64 {
        let mut items = Vec::new();
        for child in self.doc.children(parent).to_vec() {
            match self.doc.data(child) {
                Some(NodeData::Element(_)) => {
                    if self.is_out_of_flow(child) {
                        self.absolute(child, abs_cb);
                    } else if self.display(child) == "none" {
                        self.hide(child);
                    } else {
                        items.push(child);
                    }
                }
                Some(NodeData::Text(t)) if !t.trim().is_empty() => items.push(child),
                _ => {}
            }
        }
        if items.is_empty() {
            return 0.0;
        }
        let explicit: Vec<Option<f64>> = items
            .iter()
            .map(|i| {
                let s = self.style(*i)?;
                let w = s.length("width", Some(width))?;
                let bm = self.box_model(s, width);
                let inner = if s.get("box-sizing") == Some("border-box") { w } else { w + bm.horizontal() };
                Some(inner + bm.margin[1] + bm.margin[3])
            })
            .collect();
        let fixed: f64 = explicit.iter().flatten().sum();
        let flexible = explicit.iter().filter(|e| e.is_none()).count();
        let share = if flexible > 0 {
            ((width - fixed) / flexible as f64).max(0.0)
        } else {
            0.0
        };

        let mut cursor_x = x;
        let mut height: f64 = 0.0;
        for (item, fixed_width) in items.into_iter().zip(explicit) {
            let w = fixed_width.unwrap_or(share);
            if self.doc.element(item).is_some() {
                height = height.max(self.block(item, cursor_x, y, w, Some(w), abs_cb));
            } else {
                let mut l = LineCursor::new(cursor_x, y, w);
                self.inline(item, parent, &mut l, abs_cb);
                height = height.max(l.bottom() - y);
            }
            cursor_x += w;
        }
        height
    }

    fn inline(&mut self, id: NodeId, parent: NodeId, line: &mut LineCursor, abs_cb: Rect) {
        match self.doc.data(id) {
            Some(NodeData::Text(text)) => {
                let (glyph, line_height, nowrap) = self.text_metrics(parent);
                if nowrap {
                    let w = text.split_whitespace().map(|w| w.chars().count() + 1).sum::<usize>() as f64 * glyph;
                    if w > 0.0 {
                        line.place(w, line_height);
                    }
                    return;
                }
                for word in text.split_whitespace() {
                    line.place((word.chars().count() + 1) as f64 * glyph, line_height);
                }
            }
            Some(NodeData::Element(_)) => {
                let display = self.display(id).to_string();
                match display.as_str() {
                    "none" => self.hide(id),
                    "inline" if !self.is_replaced(id) => {
                        if self.tag(id) == "br" {
                            if line.line_height == 0.0 {
                                line.line_height = self.text_metrics(parent).1;
                            }
                            line.used = true;
                            line.break_line();
                            self.boxes.insert(id, LayoutBox::default());
                            return;
                        }
                        let start = Rect::new(line.x, line.y, 0.0, self.text_metrics(id).1);
                        for child in self.doc.children(id).to_vec() {
                            if self.doc.element(child).is_some() && self.is_out_of_flow(child) {
                                self.absolute(child, abs_cb);
                            } else {
                                self.inline(child, id, line, abs_cb);
                            }
                        }
                        let end = Rect::new(line.x, line.y, 0.0, line.line_height.max(start.height));
                        let rect = if (start.y - end.y).abs() < f64::EPSILON {
                            Rect::new(start.x, start.y, end.x - start.x, end.height)
                        } else {
                            Rect::new(line.left, start.y, line.width, end.bottom() - start.y)
                        };
                        self.boxes.insert(
                            id,
                            LayoutBox {
                                rect,
                                content_width: rect.width,
                                content_height: rect.height,
                            },
                        );
                    }
                    _ => {
                        // atomic inline: size it at the pen, then move it if the line wrapped
                        let avail = line.width;
                        let shrink = self.max_content_width(id).min(avail);
                        let (pen_x, pen_y) = (line.x, line.y);
                        let height = self.block(id, pen_x, pen_y, avail, Some(shrink), abs_cb);
                        let border_width = self.boxes.get(&id).map(|b| b.rect.width).unwrap_or(0.0);
                        let margins = self
                            .style(id)
                            .map(|s| self.box_model(s, avail))
                            .map(|bm| bm.margin[1] + bm.margin[3])
                            .unwrap_or(0.0);
                        let slot = line.place(border_width + margins, height);
                        if slot.x != pen_x || slot.y != pen_y {
                            self.block(id, slot.x, slot.y, avail, Some(shrink), abs_cb);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Absolutely positioned box against `cb` (the viewport for `fixed`).
    fn absolute(&mut self, id: NodeId, cb: Rect) {
        let Some(s) = self.style(id).cloned() else { return };
        if s.display() == "none" {
            self.hide(id);
            return;
        }
        let cb = if s.position() == "fixed" { self.viewport } else { cb };
        let left = s.length("left", Some(cb.width)).unwrap_or(0.0);
        let top = s.length("top", Some(cb.height)).unwrap_or(0.0);
        let shrink = self.max_content_width(id).min(cb.width);
        self.block(id, cb.x + left, cb.y + top, cb.width, Some(shrink), cb);
    }
}
