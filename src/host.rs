//! Page host: acquires a document, runs the engine and observes its payload.

use crate::dom::{Document, LiveDom, Selector};
use crate::segment::{self, Role, Segment, SegmentMessage};
use crate::{Error, HostConfig, Result};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tokio::sync::oneshot;

#[cfg(feature = "fetch")]
use reqwest::blocking::Client;
#[cfg(feature = "fetch")]
use std::time::Duration;

/// Success body of the segmentation surface: `{ "segments": [...] }`.
///
/// `marked` is only filled when [`HostConfig::reextract_marked`] is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marked: Vec<MarkedElement>,
}

/// An element found again by its segment marker class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkedElement {
    pub role: Role,
    pub width: f64,
    pub height: f64,
    pub html: String,
}

/// Marker lookup order used when re-extracting.
const REEXTRACT_ORDER: [Role; 6] = [
    Role::Header,
    Role::Navbar,
    Role::Main,
    Role::Sidebar,
    Role::Gallery,
    Role::Footer,
];

static MARKERS: LazyLock<Vec<(Role, Selector)>> = LazyLock::new(|| {
    REEXTRACT_ORDER
        .iter()
        .map(|role| {
            let sel = Selector::parse(&format!(".{}", role.marker_class())).expect("valid marker selector");
            (*role, sel)
        })
        .collect()
});

/// Re-query `dom` for segment marker classes and measure each hit.
///
/// Zero or several hits per role are fine. This is a coarser, independent
/// view; the engine's own [`Segment::rect`] stays authoritative.
pub fn reextract_marked<D: LiveDom + ?Sized>(dom: &D) -> Vec<MarkedElement> {
    let mut out = Vec::new();
    for (role, selector) in MARKERS.iter() {
        for node in dom.query_selector_all(dom.root(), selector) {
            let rect = dom.bounding_rect(node);
            out.push(MarkedElement {
                role: *role,
                width: rect.width,
                height: rect.height,
                html: dom.outer_html(node),
            });
        }
    }
    out
}

/// Runs the segmentation engine against parsed or fetched pages.
pub struct PageHost {
    config: HostConfig,
    #[cfg(feature = "fetch")]
    client: Client,
}

impl PageHost {
    pub fn new(config: HostConfig) -> Result<Self> {
        #[cfg(feature = "fetch")]
        let client = {
            let mut headers = reqwest::header::HeaderMap::new();
            for (name, value) in &config.headers {
                let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| Error::ConfigError(format!("bad header name '{}': {}", name, e)))?;
                let value = reqwest::header::HeaderValue::from_str(value)
                    .map_err(|e| Error::ConfigError(format!("bad header value for '{}': {}", name, e)))?;
                headers.insert(name, value);
            }
            Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .user_agent(config.user_agent.clone())
                .default_headers(headers)
                .build()
                .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?
        };

        Ok(Self {
            config,
            #[cfg(feature = "fetch")]
            client,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Parse `html` at the configured viewport.
    pub fn load_html(&self, html: &str) -> Document {
        Document::parse(html, self.config.viewport)
    }

    /// Invoke the engine on a loaded document and observe its single message.
    pub fn segment_document<D: LiveDom + ?Sized>(&self, dom: &mut D) -> Result<SegmentResponse> {
        let (tx, mut rx) = oneshot::channel::<SegmentMessage>();
        segment::run_segmentation(dom, tx);
        // the engine is synchronous, so the payload is either here or never coming
        let message = rx.try_recv().map_err(|_| Error::ChannelClosed)?;
        let segments = message.into_segments();
        log::debug!("engine posted {} segments", segments.len());

        let marked = if self.config.reextract_marked {
            reextract_marked(dom)
        } else {
            Vec::new()
        };
        Ok(SegmentResponse { segments, marked })
    }

    pub fn segment_html(&self, html: &str) -> Result<SegmentResponse> {
        let mut doc = self.load_html(html);
        self.segment_document(&mut doc)
    }

    /// Fetch `url` and segment it.
    #[cfg(feature = "fetch")]
    pub fn segment_url(&self, url: &str) -> Result<SegmentResponse> {
        let mut doc = self.navigate(url)?;
        self.segment_document(&mut doc)
    }

    /// Fetch a page plus its linked stylesheets into a document.
    #[cfg(feature = "fetch")]
    pub fn navigate(&self, url: &str) -> Result<Document> {
        let target = validate_url(url)?;
        log::info!("navigating to {}", target);

        let resp = self.client.get(target.clone()).send().map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout_ms)
            } else {
                Error::NavigationError {
                    url: target.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: target.to_string(),
            });
        }

        let body = resp.text().map_err(|e| Error::NavigationError {
            url: target.to_string(),
            reason: format!("failed to read response body: {}", e),
        })?;

        let mut doc = self.load_html(&body);
        self.load_stylesheets(&mut doc, &target);
        Ok(doc)
    }

    /// Fetch `<link rel="stylesheet">` targets and append them to the head as
    /// `<style>` elements. Failures only cost the sheet.
    #[cfg(feature = "fetch")]
    fn load_stylesheets(&self, doc: &mut Document, base: &url::Url) {
        static LINKS: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse(r#"link[rel="stylesheet"]"#).expect("valid link selector"));

        let hrefs: Vec<String> = doc
            .select(doc.root(), &LINKS)
            .into_iter()
            .filter_map(|link| doc.attr(link, "href").map(str::to_string))
            .collect();
        let Some(head) = doc.head() else { return };

        for href in hrefs {
            let css_url = match base.join(&href) {
                Ok(u) => u,
                Err(e) => {
                    log::warn!("skipping stylesheet '{}': {}", href, e);
                    continue;
                }
            };
            let text = self
                .client
                .get(css_url.clone())
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text());
            match text {
                Ok(css) if !css.trim().is_empty() => {
                    let style = doc.create_element("style");
                    let content = doc.create_text(&css);
                    doc.append_child(style, content);
                    doc.append_child(head, style);
                    log::debug!("loaded stylesheet {}", css_url);
                }
                Ok(_) => {}
                Err(e) => log::warn!("failed to load stylesheet {}: {}", css_url, e),
            }
        }
    }
}

/// Check that `url` is present and an absolute http(s) URL.
#[cfg(feature = "fetch")]
pub fn validate_url(url: &str) -> Result<url::Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingUrl);
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!("{}: unsupported scheme '{}'", trimmed, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><style>nav { display: flex }</style></head><body>
        <header><h1>Acme Widgets</h1><nav><a href="/a">About us</a><a href="/b">Contact</a></nav></header>
        <main><img src="hero.jpg" width="600" height="200"><p>We build the finest widgets in town.</p></main>
        <footer>Copyright Acme 2024</footer>
        <script>track()</script>
    </body></html>"#;

    #[test]
    fn segments_html_through_the_channel() {
        let host = PageHost::new(HostConfig::default()).unwrap();
        let response = host.segment_html(PAGE).unwrap();
        let roles: Vec<_> = response.segments.iter().map(|s| s.role).collect();
        assert_eq!(roles, [Role::Header, Role::Navbar, Role::Main, Role::Footer]);
        for s in &response.segments {
            assert!(!s.html.contains("<script"));
            assert!(!s.html.contains("<img"));
            assert!(!s.html.contains("Acme"));
        }
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["segments"][0]["role"], "HEADER");
    }

    #[test]
    fn marked_elements_can_be_found_again() {
        let host = PageHost::new(HostConfig::default()).unwrap();
        let mut doc = host.load_html(PAGE);
        let response = host.segment_document(&mut doc).unwrap();
        assert!(response.marked.is_empty());
        let marked = reextract_marked(&doc);
        let roles: Vec<_> = marked.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::Header, Role::Navbar, Role::Main, Role::Footer]);

        let main = response.segments.iter().find(|s| s.role == Role::Main).unwrap();
        let main_marked = marked.iter().find(|m| m.role == Role::Main).unwrap();
        assert_eq!(main.rect.width, main_marked.width);
    }

    #[test]
    fn reextraction_is_returned_only_when_enabled() {
        let plain = PageHost::new(HostConfig::default()).unwrap();
        let response = plain.segment_html(PAGE).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("marked").is_none());

        let config = HostConfig {
            reextract_marked: true,
            ..HostConfig::default()
        };
        let host = PageHost::new(config).unwrap();
        let response = host.segment_html(PAGE).unwrap();
        let roles: Vec<_> = response.marked.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::Header, Role::Navbar, Role::Main, Role::Footer]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["marked"][0]["role"], "HEADER");
    }

    #[test]
    fn empty_document_yields_no_segments() {
        let host = PageHost::new(HostConfig::default()).unwrap();
        let response = host.segment_html("").unwrap();
        assert!(response.segments.is_empty());
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn url_validation() {
        assert!(matches!(validate_url("  "), Err(Error::MissingUrl)));
        assert!(matches!(validate_url("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com/"), Err(Error::InvalidUrl(_))));
        assert_eq!(validate_url("https://example.com").unwrap().as_str(), "https://example.com/");
    }

    #[test]
    fn bad_header_is_a_config_error() {
        let mut config = HostConfig::default();
        config.headers.insert("Bad Header".into(), "x".into());
        let result = PageHost::new(config);
        if cfg!(feature = "fetch") {
            assert!(matches!(result, Err(Error::ConfigError(_))));
        }
    }
}
