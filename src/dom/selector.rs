//! CSS selectors over the arena DOM.
//!
//! Parsing and matching are done by the `selectors` crate with scraper's
//! [`Simple`] selector implementation, so combinators, attribute operators
//! and tree-structural pseudo-classes (`:first-child`, `:nth-of-type(..)`,
//! `:not(..)`, ...) behave as in a browser. State pseudo-classes such as
//! `:hover` never match and do not parse.

use super::{Document, NodeData, NodeId};
use cssparser::{Delimiter, Parser as CssParser, ParserInput};
use html5ever::{LocalName, Namespace};
use scraper::selector::{NonTSPseudoClass, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{self, ElementSelectorFlags, MatchingContext, MatchingMode, QuirksMode};
use selectors::parser::{self, SelectorList, SelectorParseErrorKind};
use selectors::{Element, OpaqueElement};
use thiserror::Error;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// (id, class/attribute/pseudo-class, type) counts
pub type Specificity = (u32, u32, u32);

fn unpack_specificity(packed: u32) -> Specificity {
    (packed >> 20, (packed >> 10) & 0x3ff, packed & 0x3ff)
}

struct SelectorParser;

impl<'i> parser::Parser<'i> for SelectorParser {
    type Impl = Simple;
    type Error = SelectorParseErrorKind<'i>;
}

/// A comma-separated selector list.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    alternatives: Vec<parser::Selector<Simple>>,
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Selector {
    /// Parse a selector list; any invalid member fails the whole list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let source = input.trim().to_string();
        let mut css_input = ParserInput::new(input);
        let mut css = CssParser::new(&mut css_input);
        let list = SelectorList::parse(&SelectorParser, &mut css).map_err(|e| SelectorError {
            selector: source.clone(),
            reason: format!("{:?}", e.kind),
        })?;
        Ok(Self {
            source,
            alternatives: list.0.into_vec(),
        })
    }

    /// Parse a rule prelude member by member, keeping what parses.
    ///
    /// `.a, .a:hover` keeps `.a`. Returns `None` when no member survives.
    pub(crate) fn parse_forgiving<'i>(input: &mut CssParser<'i, '_>) -> Option<Self> {
        let start = input.position();
        let mut alternatives = Vec::new();
        loop {
            let member = input.parse_until_before(Delimiter::Comma, |i: &mut CssParser<'i, '_>| {
                parser::Selector::parse(&SelectorParser, i)
            });
            match member {
                Ok(selector) => alternatives.push(selector),
                Err(e) => log::debug!("dropping selector: {:?}", e.kind),
            }
            if input.next().is_err() {
                break;
            }
        }
        if alternatives.is_empty() {
            return None;
        }
        Some(Self {
            source: input.slice_from(start).trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matching_specificity(doc, node).is_some()
    }

    /// Highest specificity among the members that match `node`.
    pub fn matching_specificity(&self, doc: &Document, node: NodeId) -> Option<Specificity> {
        let element = ArenaElement::new(doc, node)?;
        let mut context = MatchingContext::new(MatchingMode::Normal, None, None, QuirksMode::NoQuirks);
        self.alternatives
            .iter()
            .filter(|s| matching::matches_selector(s, 0, None, &element, &mut context, &mut |_, _| {}))
            .map(|s| unpack_specificity(s.specificity()))
            .max()
    }
}

/// An element of a [`Document`] as seen by the selector matcher.
#[derive(Clone, Copy)]
struct ArenaElement<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for ArenaElement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> {:?}", self.name(), self.id)
    }
}

impl<'a> ArenaElement<'a> {
    fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        doc.element(id)?;
        Some(Self { doc, id })
    }

    fn name(&self) -> &'a str {
        self.doc.element(self.id).map(|e| e.name.as_str()).unwrap_or("")
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        self.doc.attr(self.id, name)
    }

    fn sibling_element(&self, step: isize) -> Option<Self> {
        let parent = self.doc.parent(self.id)?;
        let siblings = self.doc.children(parent);
        let mut pos = siblings.iter().position(|c| *c == self.id)? as isize;
        loop {
            pos += step;
            if pos < 0 {
                return None;
            }
            let candidate = *siblings.get(pos as usize)?;
            if let Some(el) = Self::new(self.doc, candidate) {
                return Some(el);
            }
        }
    }
}

impl Element for ArenaElement<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        match self.doc.nodes.get(self.id.index()) {
            Some(node) => OpaqueElement::new(node),
            None => OpaqueElement::new(self.doc),
        }
    }

    fn parent_element(&self) -> Option<Self> {
        Self::new(self.doc, self.doc.parent(self.id)?)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(-1)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(1)
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &LocalName) -> bool {
        self.name() == &**local_name
    }

    fn has_namespace(&self, ns: &Namespace) -> bool {
        &**ns == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.name() == other.name()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &LocalName,
        operation: &AttrSelectorOperation<&String>,
    ) -> bool {
        // attributes live in the null namespace
        if matches!(*ns, NamespaceConstraint::Specific(url) if !url.is_empty()) {
            return false;
        }
        self.attr(local_name).is_some_and(|value| operation.eval_str(value))
    }

    // Simple has no state pseudo-classes or pseudo-elements to match
    fn match_non_ts_pseudo_class<F>(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<Simple>,
        _flags_setter: &mut F,
    ) -> bool
    where
        F: FnMut(&Self, ElementSelectorFlags),
    {
        false
    }

    fn match_pseudo_element(&self, _pe: &PseudoElement, _context: &mut MatchingContext<Simple>) -> bool {
        false
    }

    fn is_link(&self) -> bool {
        matches!(self.name(), "a" | "area") && self.attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &LocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.attr("id")
            .is_some_and(|v| case_sensitivity.eq(id.as_bytes(), v.as_bytes()))
    }

    fn has_class(&self, name: &LocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.attr("class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|c| case_sensitivity.eq(name.as_bytes(), c.as_bytes()))
        })
    }

    fn exported_part(&self, _name: &LocalName) -> Option<LocalName> {
        None
    }

    fn imported_part(&self, _name: &LocalName) -> Option<LocalName> {
        None
    }

    fn is_part(&self, _name: &LocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self.doc.children(self.id).iter().any(|c| match self.doc.data(*c) {
            Some(NodeData::Element(_)) => true,
            Some(NodeData::Text(t)) => !t.is_empty(),
            _ => false,
        })
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.id) == Some(self.doc.root())
    }
}
