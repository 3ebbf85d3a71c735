//! Role detection: selector table plus a geometric fallback for MAIN.

use super::Role;
use crate::dom::{LiveDom, NodeId, Selector};
use std::sync::LazyLock;

/// Role table in serialization order.
pub static ROLE_SELECTORS: LazyLock<Vec<(Role, Selector)>> = LazyLock::new(|| {
    [
        (Role::Header, r#"header, [role="banner"]"#),
        (Role::Navbar, r#"nav, [role="navigation"]"#),
        (Role::Sidebar, r#"aside, [role="complementary"]"#),
        (Role::Main, r#"main, [role="main"]"#),
        (Role::Gallery, r#".gallery, [aria-label*="gallery"]"#),
        (Role::Footer, r#"footer, [role="contentinfo"]"#),
    ]
    .into_iter()
    .map(|(role, sel)| (role, Selector::parse(sel).expect("valid role selector")))
    .collect()
});

static FALLBACK_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("valid container selector"));

/// A detected element together with the role it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub role: Role,
    pub node: NodeId,
}

/// Every element matching a role selector, grouped by role in table order
/// and in document order within a role. An element matching two roles is a
/// candidate for both.
pub fn match_roles<D: LiveDom + ?Sized>(dom: &D) -> Vec<Candidate> {
    ROLE_SELECTORS
        .iter()
        .flat_map(|(role, selector)| {
            dom.query_selector_all(dom.root(), selector)
                .into_iter()
                .map(|node| Candidate { role: *role, node })
        })
        .collect()
}

/// Largest-area `div` under the body; the earliest one wins ties.
///
/// A zero area still qualifies, only an absent container yields `None`.
pub fn fallback_main<D: LiveDom + ?Sized>(dom: &D) -> Option<NodeId> {
    let body = dom.body()?;
    let mut best: Option<(NodeId, f64)> = None;
    for node in dom.query_selector_all(body, &FALLBACK_CONTAINER) {
        let area = dom.bounding_rect(node).area();
        if best.map_or(true, |(_, a)| area > a) {
            best = Some((node, area));
        }
    }
    best.map(|(node, _)| node)
}

/// Role candidates with the MAIN fallback applied.
///
/// A fallback MAIN takes the slot MAIN has in the role table, so the
/// candidate list stays in table order.
pub fn detect_segments<D: LiveDom + ?Sized>(dom: &D) -> Vec<Candidate> {
    let mut candidates = match_roles(dom);
    if candidates.iter().any(|c| c.role == Role::Main) {
        log::debug!("detected {} role candidates", candidates.len());
        return candidates;
    }
    match fallback_main(dom) {
        Some(node) => {
            log::debug!("no MAIN role matched, falling back to largest container {:?}", node);
            let slot = candidates
                .iter()
                .position(|c| c.role > Role::Main)
                .unwrap_or(candidates.len());
            candidates.insert(slot, Candidate { role: Role::Main, node });
        }
        None => log::debug!("no MAIN role matched and no container to fall back to"),
    }
    log::debug!("detected {} role candidates", candidates.len());
    candidates
}
