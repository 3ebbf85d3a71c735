//! Cascade and computed values.
//!
//! Origins, lowest first: user-agent defaults by tag, author rules from
//! `<style>` sheets (specificity, then source order), the `style` attribute.
//! `!important` author/inline declarations beat every normal one.

use super::css::{Declaration, Declarations, StyleSheet};
use crate::dom::{Document, NodeData, NodeId};
use std::collections::HashMap;

/// Longhands reported by [`ComputedStyle`], in enumeration order.
pub const PROPERTIES: &[&str] = &[
    "align-items",
    "background-color",
    "background-image",
    "border-bottom-color",
    "border-bottom-style",
    "border-bottom-width",
    "border-left-color",
    "border-left-style",
    "border-left-width",
    "border-right-color",
    "border-right-style",
    "border-right-width",
    "border-top-color",
    "border-top-style",
    "border-top-width",
    "box-sizing",
    "color",
    "display",
    "flex-direction",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "height",
    "justify-content",
    "left",
    "line-height",
    "margin-bottom",
    "margin-left",
    "margin-right",
    "margin-top",
    "padding-bottom",
    "padding-left",
    "padding-right",
    "padding-top",
    "position",
    "text-align",
    "text-decoration",
    "top",
    "visibility",
    "white-space",
    "width",
];

const INHERITED: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "line-height",
    "text-align",
    "visibility",
    "white-space",
];

pub(crate) const BASE_FONT_SIZE: f64 = 16.0;

fn initial_value(name: &str) -> &'static str {
    match name {
        "align-items" | "justify-content" | "line-height" | "white-space" => "normal",
        "background-color" => "rgba(0, 0, 0, 0)",
        "background-image" | "text-decoration" => "none",
        n if n.starts_with("border-") && n.ends_with("-color") => "currentcolor",
        n if n.starts_with("border-") && n.ends_with("-style") => "none",
        n if n.starts_with("border-") && n.ends_with("-width") => "medium",
        "box-sizing" => "content-box",
        "color" => "rgb(0, 0, 0)",
        "display" => "inline",
        "flex-direction" => "row",
        "font-family" => "serif",
        "font-size" => "16px",
        "font-style" => "normal",
        "font-weight" => "400",
        "height" | "width" | "left" | "top" => "auto",
        "position" => "static",
        "text-align" => "start",
        "visibility" => "visible",
        _ => "0px",
    }
}

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "div", "p", "header", "nav", "main", "aside", "footer", "section", "article",
    "ul", "ol", "dl", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6", "form", "fieldset", "figure",
    "figcaption", "blockquote", "pre", "address", "hr", "details", "summary", "center", "legend",
];

const HIDDEN_TAGS: &[&str] = &[
    "head", "script", "style", "title", "meta", "link", "template", "noscript", "base",
];

/// Elements whose content is not laid out as normal flow.
pub(crate) const REPLACED_TAGS: &[&str] = &[
    "img", "video", "canvas", "svg", "iframe", "embed", "object", "audio", "input", "textarea", "select",
];

/// User-agent stylesheet, expressed per tag.
fn ua_declarations(tag: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    let mut d = |name: &str, value: &str| out.push(Declaration::new(name, value, false));

    if BLOCK_TAGS.contains(&tag) {
        d("display", "block");
    } else if HIDDEN_TAGS.contains(&tag) {
        d("display", "none");
    } else if REPLACED_TAGS.contains(&tag) || tag == "button" {
        d("display", "inline-block");
    }
    match tag {
        "li" => d("display", "list-item"),
        "table" => d("display", "table"),
        "thead" | "tbody" | "tfoot" => d("display", "table-row-group"),
        "tr" => d("display", "table-row"),
        "td" | "th" => d("display", "table-cell"),
        _ => {}
    }
    match tag {
        "b" | "strong" | "th" => d("font-weight", "700"),
        "i" | "em" | "cite" | "var" | "dfn" | "address" => d("font-style", "italic"),
        "a" | "u" | "ins" => d("text-decoration", "underline"),
        "pre" | "code" | "kbd" | "samp" => d("font-family", "monospace"),
        "small" => d("font-size", "0.83em"),
        _ => {}
    }
    if tag == "pre" {
        d("white-space", "pre");
    }
    let heading = match tag {
        "h1" => Some(("2em", "0.67em")),
        "h2" => Some(("1.5em", "0.83em")),
        "h3" => Some(("1.17em", "1em")),
        "h4" => Some(("1em", "1.33em")),
        "h5" => Some(("0.83em", "1.67em")),
        "h6" => Some(("0.67em", "2.33em")),
        _ => None,
    };
    if let Some((size, margin)) = heading {
        d("font-size", size);
        d("font-weight", "700");
        d("margin-top", margin);
        d("margin-bottom", margin);
    }
    match tag {
        "body" => {
            for side in ["top", "right", "bottom", "left"] {
                d(&format!("margin-{}", side), "8px");
            }
        }
        "p" | "ul" | "ol" | "dl" | "blockquote" | "figure" => {
            d("margin-top", "1em");
            d("margin-bottom", "1em");
        }
        _ => {}
    }
    match tag {
        "ul" | "ol" => d("padding-left", "40px"),
        "blockquote" | "figure" => {
            d("margin-left", "40px");
            d("margin-right", "40px");
        }
        "hr" => d("border", "1px inset"),
        _ => {}
    }
    out
}

/// Fully resolved presentation of one element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedStyle {
    values: Vec<(&'static str, String)>,
}

impl ComputedStyle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
    }

    pub(crate) fn set(&mut self, name: &'static str, value: String) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    /// Properties in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn display(&self) -> &str {
        self.get("display").unwrap_or("inline")
    }

    pub fn position(&self) -> &str {
        self.get("position").unwrap_or("static")
    }

    pub fn font_size(&self) -> f64 {
        self.get("font-size")
            .and_then(|v| parse_length(v, BASE_FONT_SIZE, None))
            .unwrap_or(BASE_FONT_SIZE)
    }

    /// Used line height in px (`normal` is 1.2 × font size).
    pub fn line_height(&self) -> f64 {
        let fs = self.font_size();
        match self.get("line-height") {
            Some("normal") | None => fs * 1.2,
            Some(v) => match v.parse::<f64>() {
                Ok(factor) => fs * factor,
                Err(_) => parse_length(v, fs, Some(fs)).unwrap_or(fs * 1.2),
            },
        }
    }

    /// Resolve a length property; `None` for `auto` and unresolvable values.
    pub fn length(&self, name: &str, percent_basis: Option<f64>) -> Option<f64> {
        parse_length(self.get(name)?, self.font_size(), percent_basis)
    }

    /// True when the resolved background image references a url.
    pub fn has_background_url(&self) -> bool {
        self.get("background-image")
            .is_some_and(|v| v != "none" && v.contains("url("))
    }
}

/// Parse a CSS length into px.
pub fn parse_length(value: &str, font_size: f64, percent_basis: Option<f64>) -> Option<f64> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let (num, unit) = v.split_at(split);
    let n: f64 = num.parse().ok()?;
    match unit {
        "px" => Some(n),
        "em" => Some(n * font_size),
        "rem" => Some(n * BASE_FONT_SIZE),
        "pt" => Some(n * 4.0 / 3.0),
        "%" => percent_basis.map(|b| b * n / 100.0),
        "" => Some(n),
        _ => None,
    }
}

/// Format px the way computed values are reported.
pub fn format_px(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}px", rounded as i64)
    } else {
        format!("{}px", rounded)
    }
}

fn font_size_keyword(v: &str) -> Option<f64> {
    Some(match v {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        _ => return None,
    })
}

fn border_width_keyword(v: &str) -> Option<&'static str> {
    Some(match v {
        "thin" => "1px",
        "medium" => "3px",
        "thick" => "5px",
        _ => return None,
    })
}

/// Cascaded-value rank: (important, origin, specificity, source order)
type Rank = (bool, u8, (u32, u32, u32), usize);

/// Compute styles for every connected element, parents before children.
pub fn compute_styles(doc: &Document, sheet: &StyleSheet) -> HashMap<NodeId, ComputedStyle> {
    let mut styles: HashMap<NodeId, ComputedStyle> = HashMap::new();
    let mut stack = vec![doc.root()];
    while let Some(node) = stack.pop() {
        if let Some(NodeData::Element(el)) = doc.data(node) {
            let parent_style = doc.parent(node).and_then(|p| styles.get(&p));
            let cascaded = cascade(doc, sheet, node, &el.name);
            let computed = resolve(&cascaded, parent_style);
            styles.insert(node, computed);
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    styles
}

fn cascade(doc: &Document, sheet: &StyleSheet, node: NodeId, tag: &str) -> HashMap<String, (Rank, String)> {
    let mut winners: HashMap<String, (Rank, String)> = HashMap::new();
    let mut offer = |decl: Declaration, rank: Rank| {
        let beaten = winners.get(&decl.name).is_some_and(|(existing, _)| *existing > rank);
        if !beaten {
            winners.insert(decl.name, (rank, decl.value));
        }
    };

    for (order, decl) in ua_declarations(tag).iter().flat_map(expand_one).enumerate() {
        offer(decl, (false, 0, (0, 0, 0), order));
    }
    for (order, rule) in sheet.rules.iter().enumerate() {
        let Some(spec) = rule.selector.matching_specificity(doc, node) else {
            continue;
        };
        for decl in rule.declarations.expanded() {
            let important = decl.important;
            offer(decl, (important, 1, spec, order));
        }
    }
    if let Some(style) = doc.attr(node, "style") {
        for decl in Declarations::parse(style).expanded() {
            let important = decl.important;
            offer(decl, (important, 2, (0, 0, 0), 0));
        }
    }
    winners
}

fn expand_one(decl: &Declaration) -> Vec<Declaration> {
    let mut block = Declarations::default();
    block.set(&decl.name, &decl.value, decl.important);
    block.expanded()
}

fn resolve(cascaded: &HashMap<String, (Rank, String)>, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let parent_font = parent.map(ComputedStyle::font_size).unwrap_or(BASE_FONT_SIZE);
    let specified = |name: &'static str| -> String {
        let inherited = || parent.and_then(|p| p.get(name)).map(str::to_string);
        match cascaded.get(name).map(|(_, v)| v.as_str()) {
            Some("inherit") => inherited().unwrap_or_else(|| initial_value(name).to_string()),
            Some("initial") => initial_value(name).to_string(),
            Some("unset") | None => {
                if INHERITED.contains(&name) {
                    inherited().unwrap_or_else(|| initial_value(name).to_string())
                } else {
                    initial_value(name).to_string()
                }
            }
            Some(v) => v.to_string(),
        }
    };

    let mut out = ComputedStyle::default();

    // font-size first: everything else in em depends on it
    let fs_raw = specified("font-size");
    let font_size = font_size_keyword(&fs_raw)
        .or_else(|| parse_length(&fs_raw, parent_font, Some(parent_font)))
        .unwrap_or(parent_font);

    let color = specified("color");

    for &name in PROPERTIES {
        let raw = if name == "font-size" {
            format_px(font_size)
        } else {
            specified(name)
        };
        let value = match name {
            "font-size" | "color" => raw,
            n if n.starts_with("border-") && n.ends_with("-width") => {
                let style_name = n.replace("-width", "-style");
                let style = cascaded
                    .get(style_name.as_str())
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("none");
                if style == "none" || style == "hidden" {
                    "0px".to_string()
                } else {
                    let px = border_width_keyword(&raw).unwrap_or(raw.as_str()).to_string();
                    parse_length(&px, font_size, None).map(format_px).unwrap_or(px)
                }
            }
            n if n.starts_with("border-") && n.ends_with("-color") => {
                if raw.eq_ignore_ascii_case("currentcolor") {
                    color.clone()
                } else {
                    raw
                }
            }
            n if n.starts_with("margin-") || n.starts_with("padding-") || n == "left" || n == "top" => {
                if raw.ends_with('%') {
                    raw
                } else {
                    parse_length(&raw, font_size, None).map(format_px).unwrap_or(raw)
                }
            }
            "line-height" => {
                if raw == "normal" || raw.parse::<f64>().is_ok() {
                    raw
                } else {
                    parse_length(&raw, font_size, Some(font_size)).map(format_px).unwrap_or(raw)
                }
            }
            "font-weight" => match raw.as_str() {
                "normal" => "400".to_string(),
                "bold" | "bolder" => "700".to_string(),
                "lighter" => "300".to_string(),
                _ => raw,
            },
            "text-decoration" => {
                let first = raw.split_whitespace().next().unwrap_or("none");
                match first {
                    "underline" | "overline" | "line-through" | "none" => raw,
                    _ => "none".to_string(),
                }
            }
            _ => raw,
        };
        out.set(name, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;
    use crate::Viewport;

    fn styles_for(html: &str, sel: &str) -> ComputedStyle {
        let d = Document::parse(html, Viewport::default());
        let node = d.select(d.root(), &Selector::parse(sel).unwrap())[0];
        d.computed_style(node).unwrap()
    }

    #[test]
    fn parse_length_units() {
        assert_eq!(parse_length("10px", 16.0, None), Some(10.0));
        assert_eq!(parse_length("2em", 10.0, None), Some(20.0));
        assert_eq!(parse_length("50%", 16.0, Some(300.0)), Some(150.0));
        assert_eq!(parse_length("50%", 16.0, None), None);
        assert_eq!(parse_length("auto", 16.0, None), None);
        assert_eq!(parse_length("0", 16.0, None), Some(0.0));
    }

    #[test]
    fn cascade_orders_origins_and_specificity() {
        let html = r#"<html><head><style>
            p { color: red; font-weight: 300 }
            .x { color: green }
            #y { font-style: oblique !important }
        </style></head><body><p id="y" class="x" style="color: blue; font-style: normal">t</p></body></html>"#;
        let s = styles_for(html, "p");
        assert_eq!(s.get("color"), Some("blue"));
        assert_eq!(s.get("font-weight"), Some("300"));
        assert_eq!(s.get("font-style"), Some("oblique"));
    }

    #[test]
    fn inheritance_and_ua_defaults() {
        let html = r#"<html><body style="color: #123; font-size: 20px"><h1><a href="/">x</a></h1><em>e</em></body></html>"#;
        let a = styles_for(html, "a");
        assert_eq!(a.get("color"), Some("#123"));
        assert_eq!(a.get("font-size"), Some("40px"));
        assert_eq!(a.get("font-weight"), Some("700"));
        assert_eq!(a.get("text-decoration"), Some("underline"));
        let em = styles_for(html, "em");
        assert_eq!(em.get("font-style"), Some("italic"));
        assert_eq!(em.get("display"), Some("inline"));
        let h1 = styles_for(html, "h1");
        assert_eq!(h1.get("margin-top"), Some("26.8px"));
        assert_eq!(h1.get("text-decoration"), Some("none"));
    }

    #[test]
    fn borders_and_background_resolve() {
        let html = r#"<html><body><div style="border: thin solid; color: red; background: url(a.png)"></div></body></html>"#;
        let s = styles_for(html, "div");
        assert_eq!(s.get("border-top-width"), Some("1px"));
        assert_eq!(s.get("border-left-color"), Some("red"));
        assert_eq!(s.get("border-left-style"), Some("solid"));
        assert!(s.has_background_url());
        let plain = styles_for("<html><body><div></div></body></html>", "div");
        assert_eq!(plain.get("border-top-width"), Some("0px"));
        assert!(!plain.has_background_url());
        assert_eq!(plain.len(), PROPERTIES.len());
    }
}
