//! CSS declaration blocks and `<style>` sheet parsing.

use crate::dom::Selector;
use cssparser::{
    AtRuleParser, AtRuleType, CowRcStr, DeclarationListParser, DeclarationParser, ParseError, Parser,
    ParserInput, QualifiedRuleParser, RuleListParser, SourceLocation,
};

/// One `name: value [!important]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: &str, value: &str, important: bool) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
            important,
        }
    }
}

/// An ordered declaration block, as found in a `style` attribute or a rule body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    items: Vec<Declaration>,
}

impl Declarations {
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Self::parse_block(&mut parser)
    }

    fn parse_block(input: &mut Parser<'_, '_>) -> Self {
        let mut out = Self::default();
        for decl in DeclarationListParser::new(input, DeclarationCollector).flatten() {
            out.merge(decl);
        }
        out
    }

    /// Add a parsed declaration: later wins unless the earlier one is important.
    fn merge(&mut self, decl: Declaration) {
        match self.items.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) if existing.important && !decl.important => {}
            Some(existing) => *existing = decl,
            None => self.items.push(decl),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.items.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|d| d.value.as_str())
    }

    /// CSSOM `setProperty`: overwrite in place or append.
    pub fn set(&mut self, name: &str, value: &str, important: bool) {
        let decl = Declaration::new(name, value, important);
        match self.items.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.items.push(decl),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|d| !d.name.eq_ignore_ascii_case(name));
        before != self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `name:value;` pairs, the same shape computed-style inlining writes.
    pub fn to_css_text(&self) -> String {
        self.items
            .iter()
            .map(|d| {
                if d.important {
                    format!("{}:{} !important;", d.name, d.value)
                } else {
                    format!("{}:{};", d.name, d.value)
                }
            })
            .collect()
    }

    /// Declarations with shorthands replaced by their longhands.
    pub fn expanded(&self) -> Vec<Declaration> {
        let mut out = Vec::with_capacity(self.items.len());
        for d in &self.items {
            expand_shorthand(d, &mut out);
        }
        out
    }
}

fn strip_important(value: &str) -> (&str, bool) {
    let v = value.trim();
    if let Some(pos) = v.rfind('!') {
        if v[pos + 1..].trim().eq_ignore_ascii_case("important") {
            return (v[..pos].trim(), true);
        }
    }
    (v, false)
}

struct DeclarationCollector;

impl<'i> DeclarationParser<'i> for DeclarationCollector {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Declaration, ParseError<'i, ()>> {
        let start = input.position();
        while input.next().is_ok() {}
        let (value, important) = strip_important(input.slice_from(start));
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(Declaration::new(&name, value, important))
    }
}

impl<'i> AtRuleParser<'i> for DeclarationCollector {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = Declaration;
    type Error = ();
}

/// Split a value on top-level whitespace (`url(a b)` stays one token).
pub(crate) fn value_tokens(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    for (idx, c) in value.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                start.get_or_insert(idx);
            }
            '(' => {
                depth += 1;
                start.get_or_insert(idx);
            }
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    out.push(&value[s..idx]);
                }
            }
            _ => {
                start.get_or_insert(idx);
            }
        }
    }
    if let Some(s) = start {
        out.push(&value[s..]);
    }
    out
}

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

fn four_sides(value: &str) -> Option<[String; 4]> {
    let t = value_tokens(value);
    let [top, right, bottom, left] = match t.as_slice() {
        [a] => [*a, *a, *a, *a],
        [a, b] => [*a, *b, *a, *b],
        [a, b, c] => [*a, *b, *c, *b],
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return None,
    };
    Some([top.to_string(), right.to_string(), bottom.to_string(), left.to_string()])
}

fn is_border_width(token: &str) -> bool {
    matches!(token, "thin" | "medium" | "thick") || token.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

fn is_color_token(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    t.starts_with('#')
        || t.starts_with("rgb")
        || t.starts_with("hsl")
        || t == "transparent"
        || t == "currentcolor"
        || (t.chars().all(|c| c.is_ascii_alphabetic()) && !is_background_keyword(&t))
}

fn is_background_keyword(t: &str) -> bool {
    matches!(
        t,
        "none" | "repeat" | "no-repeat" | "repeat-x" | "repeat-y" | "space" | "round" | "scroll" | "fixed"
            | "local" | "top" | "bottom" | "left" | "right" | "center" | "cover" | "contain" | "auto"
            | "border-box" | "padding-box" | "content-box" | "inherit" | "initial" | "unset"
    )
}

fn expand_shorthand(d: &Declaration, out: &mut Vec<Declaration>) {
    let push = |out: &mut Vec<Declaration>, name: &str, value: &str| {
        out.push(Declaration::new(name, value, d.important));
    };
    match d.name.as_str() {
        "margin" | "padding" | "border-width" | "border-style" | "border-color" => {
            let Some(values) = four_sides(&d.value) else { return };
            for (side, v) in SIDES.iter().zip(values.iter()) {
                let name = match d.name.as_str() {
                    "margin" => format!("margin-{}", side),
                    "padding" => format!("padding-{}", side),
                    "border-width" => format!("border-{}-width", side),
                    "border-style" => format!("border-{}-style", side),
                    _ => format!("border-{}-color", side),
                };
                push(out, &name, v);
            }
        }
        "border" | "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let mut width = "medium".to_string();
            let mut style = "none".to_string();
            let mut color = "currentcolor".to_string();
            for token in value_tokens(&d.value) {
                let lower = token.to_ascii_lowercase();
                if BORDER_STYLES.contains(&lower.as_str()) {
                    style = lower;
                } else if is_border_width(&lower) {
                    width = lower;
                } else {
                    color = token.to_string();
                }
            }
            let sides: Vec<&str> = match d.name.strip_prefix("border-") {
                Some(side) => vec![side],
                None => SIDES.to_vec(),
            };
            for side in sides {
                push(out, &format!("border-{}-width", side), &width);
                push(out, &format!("border-{}-style", side), &style);
                push(out, &format!("border-{}-color", side), &color);
            }
        }
        "background" => {
            let mut image = "none".to_string();
            let mut color = "rgba(0, 0, 0, 0)".to_string();
            for token in value_tokens(&d.value) {
                let lower = token.to_ascii_lowercase();
                if lower.starts_with("url(") || lower.contains("gradient(") {
                    image = token.to_string();
                } else if is_color_token(&lower) {
                    color = token.to_string();
                }
            }
            push(out, "background-image", &image);
            push(out, "background-color", &color);
        }
        "text-decoration-line" => push(out, "text-decoration", &d.value),
        "font" => {
            let tokens = value_tokens(&d.value);
            let mut size_idx = None;
            for (i, token) in tokens.iter().enumerate() {
                let lower = token.to_ascii_lowercase();
                match lower.as_str() {
                    "italic" | "oblique" => push(out, "font-style", &lower),
                    "bold" | "bolder" | "lighter" => push(out, "font-weight", &lower),
                    "normal" | "small-caps" => {}
                    w if w.len() == 3 && w.ends_with("00") && w.parse::<u32>().is_ok() => {
                        push(out, "font-weight", w)
                    }
                    _ if lower.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                        size_idx = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            if let Some(i) = size_idx {
                let (size, line_height) = match tokens[i].split_once('/') {
                    Some((s, lh)) => (s, Some(lh)),
                    None => (tokens[i], None),
                };
                push(out, "font-size", size);
                if let Some(lh) = line_height {
                    push(out, "line-height", lh);
                }
                let family = tokens[i + 1..].join(" ");
                if !family.is_empty() {
                    push(out, "font-family", &family);
                }
            }
        }
        "flex-flow" => {
            for token in value_tokens(&d.value) {
                if token.starts_with("row") || token.starts_with("column") {
                    push(out, "flex-direction", token);
                }
            }
        }
        _ => out.push(d.clone()),
    }
}

/// A rule from a `<style>` sheet.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Declarations,
}

/// Rules compiled from document stylesheets, in source order.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    pub rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Parse CSS source, flattening grouping at-rules and skipping the rest.
    /// Selector list members that do not parse are dropped individually.
    pub fn parse(source: &str) -> Self {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let mut sheet = Self::empty();
        collect_rules(RuleListParser::new_for_stylesheet(&mut parser, RuleCollector), &mut sheet.rules);
        sheet
    }

    pub fn extend(&mut self, other: StyleSheet) {
        self.rules.extend(other.rules);
    }
}

/// A parsed top-level or nested rule.
enum ParsedRule {
    Style(StyleRule),
    Group(Vec<StyleRule>),
}

fn collect_rules<'i, I>(rules: I, out: &mut Vec<StyleRule>)
where
    I: Iterator<Item = Result<ParsedRule, (ParseError<'i, ()>, &'i str)>>,
{
    for rule in rules {
        match rule {
            Ok(ParsedRule::Style(rule)) => out.push(rule),
            Ok(ParsedRule::Group(nested)) => out.extend(nested),
            Err((_, text)) => log::debug!("skipping stylesheet rule: {}", text.trim()),
        }
    }
}

struct RuleCollector;

impl<'i> QualifiedRuleParser<'i> for RuleCollector {
    type Prelude = Selector;
    type QualifiedRule = ParsedRule;
    type Error = ();

    fn parse_prelude<'t>(&mut self, input: &mut Parser<'i, 't>) -> Result<Selector, ParseError<'i, ()>> {
        Selector::parse_forgiving(input).ok_or_else(|| input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        selector: Selector,
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<ParsedRule, ParseError<'i, ()>> {
        let declarations = Declarations::parse_block(input);
        if declarations.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(ParsedRule::Style(StyleRule { selector, declarations }))
    }
}

impl<'i> AtRuleParser<'i> for RuleCollector {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = ParsedRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtRuleType<(), ()>, ParseError<'i, ()>> {
        while input.next().is_ok() {}
        match name.to_ascii_lowercase().as_str() {
            "media" | "supports" | "layer" | "document" => Ok(AtRuleType::WithBlock(())),
            _ => Err(input.new_custom_error(())),
        }
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: (),
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<ParsedRule, ParseError<'i, ()>> {
        let mut nested = Vec::new();
        collect_rules(RuleListParser::new_for_nested_rule(input, RuleCollector), &mut nested);
        Ok(ParsedRule::Group(nested))
    }
}
