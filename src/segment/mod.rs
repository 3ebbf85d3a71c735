//! The segmentation & sanitization engine.
//!
//! Pipeline, run once per document:
//!
//! 1. remove scripts, replace media and background-image elements with
//!    placeholders ([`placeholder::clean_document`])
//! 2. detect role candidates, falling back to the largest container for
//!    MAIN ([`detect::detect_segments`])
//! 3. per candidate: sanitize, compact placeholder labels, inline computed
//!    style, measure and serialize ([`serialize::serialize_segment`])
//!
//! The engine never fails. Odd input degrades to no-ops or missing
//! segments. Results leave through a one-shot channel, see
//! [`run_segmentation`].

pub mod anonymize;
pub mod compact;
pub mod detect;
pub mod inline;
pub mod placeholder;
pub mod sanitize;
pub mod serialize;

use crate::dom::LiveDom;
use crate::rendering::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;

/// Layout role of a segment, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Header,
    Navbar,
    Sidebar,
    Main,
    Gallery,
    Footer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Header,
        Role::Navbar,
        Role::Sidebar,
        Role::Main,
        Role::Gallery,
        Role::Footer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Header => "HEADER",
            Role::Navbar => "NAVBAR",
            Role::Sidebar => "SIDEBAR",
            Role::Main => "MAIN",
            Role::Gallery => "GALLERY",
            Role::Footer => "FOOTER",
        }
    }

    /// Class added to a serialized segment root, e.g. `segment-navbar`.
    pub fn marker_class(&self) -> &'static str {
        match self {
            Role::Header => "segment-header",
            Role::Navbar => "segment-navbar",
            Role::Sidebar => "segment-sidebar",
            Role::Main => "segment-main",
            Role::Gallery => "segment-gallery",
            Role::Footer => "segment-footer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segment rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for SegmentRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

/// One sanitized, role-tagged fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub role: Role,
    /// Box after sanitization and style inlining
    pub rect: SegmentRect,
    /// Self-contained outer markup with inline styles only
    pub html: String,
}

/// Message the engine posts to its host: `{"type":"segments","payload":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum SegmentMessage {
    Segments(Vec<Segment>),
}

impl SegmentMessage {
    pub fn into_segments(self) -> Vec<Segment> {
        match self {
            SegmentMessage::Segments(segments) => segments,
        }
    }
}

/// Run the whole pipeline over `dom` and return the segments.
pub fn segment_document<D: LiveDom + ?Sized>(dom: &mut D) -> Vec<Segment> {
    placeholder::clean_document(dom);
    let candidates = detect::detect_segments(dom);
    candidates
        .into_iter()
        .map(|candidate| serialize::serialize_segment(dom, candidate))
        .collect()
}

/// Run the pipeline and post the result on `tx`.
///
/// Fire-and-forget: nothing is returned, and a host that has stopped
/// listening only costs a warning.
pub fn run_segmentation<D: LiveDom + ?Sized>(dom: &mut D, tx: oneshot::Sender<SegmentMessage>) {
    let segments = segment_document(dom);
    log::debug!("posting {} segments", segments.len());
    if tx.send(SegmentMessage::Segments(segments)).is_err() {
        log::warn!("segment receiver dropped before the payload was posted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::Viewport;

    #[test]
    fn roles_serialize_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Navbar).unwrap(), r#""NAVBAR""#);
        let back: Role = serde_json::from_str(r#""GALLERY""#).unwrap();
        assert_eq!(back, Role::Gallery);
        assert_eq!(Role::Sidebar.marker_class(), "segment-sidebar");
        assert_eq!(Role::Main.to_string(), "MAIN");
    }

    #[test]
    fn message_shape() {
        let msg = SegmentMessage::Segments(vec![Segment {
            role: Role::Footer,
            rect: SegmentRect { x: 0.0, y: 10.0, width: 20.0, height: 5.0 },
            html: "<footer></footer>".into(),
        }]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "segments");
        assert_eq!(json["payload"][0]["role"], "FOOTER");
        assert_eq!(json["payload"][0]["rect"]["y"], 10.0);
        assert_eq!(json["payload"][0]["html"], "<footer></footer>");
    }

    #[test]
    fn payload_arrives_once_on_the_channel() {
        let mut d = Document::parse(
            "<body><header>Acme</header><main><p>Hello there</p></main></body>",
            Viewport::default(),
        );
        let (tx, rx) = oneshot::channel();
        run_segmentation(&mut d, tx);
        let segments = rx.blocking_recv().unwrap().into_segments();
        let roles: Vec<_> = segments.iter().map(|s| s.role).collect();
        assert_eq!(roles, [Role::Header, Role::Main]);
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let mut d = Document::parse("<body><footer>x</footer></body>", Viewport::default());
        let (tx, rx) = oneshot::channel();
        drop(rx);
        run_segmentation(&mut d, tx);
    }
}
